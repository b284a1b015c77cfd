//! Structured scan over labelled tables.

use std::collections::{HashMap, HashSet};

use jobfeed_core::error::AppError;
use jobfeed_core::models::Job;
use jobfeed_core::sources::{Field, TableSpec};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::dom::{absolute, href, non_empty, selector, text_of};

pub(crate) struct TableStrategy {
    spec: TableSpec,
    table: Selector,
    header_cell: Selector,
    row: Selector,
    cell: Selector,
    anchor: Selector,
}

impl TableStrategy {
    pub(crate) fn new(spec: TableSpec) -> Result<Self, AppError> {
        Ok(Self {
            spec,
            table: selector("table")?,
            header_cell: selector("th")?,
            row: selector("tr")?,
            cell: selector("th, td")?,
            anchor: selector("a[href]")?,
        })
    }

    pub(crate) fn extract(&self, doc: &Html, base: &Url, limit: usize) -> Vec<Job> {
        let Some(table) = self.find_table(doc) else {
            return Vec::new();
        };

        let mut rows = table.select(&self.row);
        let columns = match rows.next() {
            Some(header_row) => self.column_map(header_row),
            None => return Vec::new(),
        };

        let mut jobs = Vec::new();
        let mut emitted = HashSet::new();
        for row in rows {
            if jobs.len() >= limit {
                break;
            }
            let cells: Vec<ElementRef<'_>> = row.select(&self.cell).collect();
            if cells.len() < self.spec.min_row_cells {
                continue;
            }
            let Some(job) = self.job_from_row(&cells, &columns, base) else {
                continue;
            };
            if emitted.insert(job.link.clone()) {
                jobs.push(job);
            }
        }
        jobs
    }

    /// First table whose header cells contain enough of the expected labels.
    fn find_table<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        doc.select(&self.table).find(|table| {
            let mut headers: Vec<String> = table
                .select(&self.header_cell)
                .map(|th| text_of(th).to_lowercase())
                .collect();
            if headers.is_empty() {
                // Some tables use a plain first row as the header.
                if let Some(first) = table.select(&self.row).next() {
                    headers = first
                        .select(&self.cell)
                        .map(|c| text_of(c).to_lowercase())
                        .collect();
                }
            }
            if headers.is_empty() {
                return false;
            }
            let hits = self
                .spec
                .columns
                .iter()
                .filter(|(_, label)| headers.iter().any(|h| h.contains(label.as_str())))
                .count();
            hits >= self.spec.min_header_matches
        })
    }

    /// Map each field to the first header column containing its label.
    fn column_map(&self, header_row: ElementRef<'_>) -> HashMap<Field, usize> {
        let mut columns = HashMap::new();
        for (i, cell) in header_row.select(&self.cell).enumerate() {
            let header = text_of(cell).to_lowercase();
            for (field, label) in &self.spec.columns {
                if header.contains(label.as_str()) {
                    columns.entry(*field).or_insert(i);
                }
            }
        }
        columns
    }

    fn job_from_row(
        &self,
        cells: &[ElementRef<'_>],
        columns: &HashMap<Field, usize>,
        base: &Url,
    ) -> Option<Job> {
        let cell_at = |field: Field| columns.get(&field).and_then(|&i| cells.get(i)).copied();
        let text = |field: Field| cell_at(field).map(text_of).and_then(non_empty);

        let title = text(Field::Title)?;
        // The apply column sometimes moves without its header; fall back to the last cell.
        let raw_link = [cell_at(Field::Link), cell_at(Field::Title), cells.last().copied()]
            .into_iter()
            .flatten()
            .find_map(|cell| self.first_href(cell))?;
        let link = absolute(base, raw_link)?;

        Some(
            Job::new(title, link)
                .with_company(text(Field::Company))
                .with_qualification(text(Field::Qualification))
                .with_experience(text(Field::Experience))
                .with_location(text(Field::Location)),
        )
    }

    fn first_href<'a>(&self, cell: ElementRef<'a>) -> Option<&'a str> {
        cell.select(&self.anchor).find_map(href)
    }
}
