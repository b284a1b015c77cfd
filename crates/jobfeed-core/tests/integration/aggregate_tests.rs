use jobfeed_core::sources::SourceSelector;
use jobfeed_core::{Aggregator, Source};

use crate::common::{LineExtractor, PageFetcher, jobs_named, links, page_of};

const FIRST: &str = "https://first.test/";
const SECOND: &str = "https://second.test/";

fn aggregator(fetcher: PageFetcher) -> Aggregator<PageFetcher, LineExtractor> {
    Aggregator::new(
        fetcher,
        vec![
            Source::new("first", FIRST, LineExtractor),
            Source::new("second", SECOND, LineExtractor),
        ],
    )
}

#[tokio::test]
async fn timed_out_source_is_skipped_silently() {
    let five = jobs_named(&["a", "b", "c", "d", "e"]);
    // FIRST has no page and times out.
    let agg = aggregator(PageFetcher::new(&[(SECOND, page_of(&five).as_str())]));

    let jobs = agg.aggregate(&SourceSelector::All, 10).await.unwrap();
    assert_eq!(links(&jobs), links(&five));
}

#[tokio::test]
async fn split_calls_match_priority_order() {
    let first = jobs_named(&["f1", "f2", "f3"]);
    let second = jobs_named(&["s1", "s2"]);
    let agg = aggregator(PageFetcher::new(&[
        (FIRST, page_of(&first).as_str()),
        (SECOND, page_of(&second).as_str()),
    ]));

    let combined = agg.aggregate(&SourceSelector::All, 10).await.unwrap();
    let mut split = agg.aggregate(&SourceSelector::one("first"), 10).await.unwrap();
    split.extend(agg.aggregate(&SourceSelector::one("second"), 10).await.unwrap());

    assert_eq!(links(&combined), links(&split));
    let expected: Vec<_> = links(&first).into_iter().chain(links(&second)).collect();
    assert_eq!(links(&combined), expected);
}

#[tokio::test]
async fn limit_applies_per_source() {
    let first = jobs_named(&["f1", "f2", "f3"]);
    let second = jobs_named(&["s1", "s2", "s3"]);
    let agg = aggregator(PageFetcher::new(&[
        (FIRST, page_of(&first).as_str()),
        (SECOND, page_of(&second).as_str()),
    ]));

    let jobs = agg.aggregate(&SourceSelector::All, 2).await.unwrap();
    assert_eq!(
        links(&jobs),
        vec![
            "https://jobs.test/f1",
            "https://jobs.test/f2",
            "https://jobs.test/s1",
            "https://jobs.test/s2",
        ]
    );
}

#[tokio::test]
async fn named_selection_is_reordered_by_priority() {
    let agg = aggregator(PageFetcher::new(&[
        (FIRST, page_of(&jobs_named(&["f"])).as_str()),
        (SECOND, page_of(&jobs_named(&["s"])).as_str()),
    ]));
    let selector: SourceSelector = "SECOND, first".parse().unwrap();
    let jobs = agg.aggregate(&selector, 5).await.unwrap();
    assert_eq!(links(&jobs), vec!["https://jobs.test/f", "https://jobs.test/s"]);
}
