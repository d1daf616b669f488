use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;

use super::domain::Match;

pub const REPORT_TITLE: &str = "Rapport de Parrainage";

/// One line of the pairing report, in the column order of the printed sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchReportRow {
    #[serde(rename = "Classe Filleul")]
    pub mentee_class: &'static str,
    #[serde(rename = "Nom Filleul")]
    pub mentee_name: String,
    #[serde(rename = "Nom Parrain")]
    pub mentor_name: String,
    #[serde(rename = "Classe Parrain")]
    pub mentor_class: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub title: &'static str,
    pub generated_on: NaiveDate,
    pub rows: Vec<MatchReportRow>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write report CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush report: {0}")]
    Io(#[from] std::io::Error),
}

impl MatchReport {
    pub fn from_matches(matches: &[Match], generated_on: NaiveDate) -> Self {
        let rows = matches
            .iter()
            .map(|entry| MatchReportRow {
                mentee_class: entry.mentee.class_name.label(),
                mentee_name: entry.mentee.name.clone(),
                mentor_name: entry.mentor.name.clone(),
                mentor_class: entry.mentor.class_name.label(),
            })
            .collect();

        Self {
            title: REPORT_TITLE,
            generated_on,
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        if self.rows.is_empty() {
            csv_writer.write_record([
                "Classe Filleul",
                "Nom Filleul",
                "Nom Parrain",
                "Classe Parrain",
            ])?;
        }
        for row in &self.rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Fixed-width text table for terminals.
    pub fn render_table(&self) -> String {
        let headers = ["Classe Filleul", "Nom Filleul", "", "Nom Parrain", "Classe Parrain"];
        let cells: Vec<[&str; 5]> = self
            .rows
            .iter()
            .map(|row| {
                [
                    row.mentee_class,
                    row.mentee_name.as_str(),
                    "->",
                    row.mentor_name.as_str(),
                    row.mentor_class,
                ]
            })
            .collect();

        let mut widths = headers.map(|header| header.chars().count());
        for line in &cells {
            for (width, cell) in widths.iter_mut().zip(line) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = format!(
            "{}\nGénéré le {}\n\n",
            self.title,
            self.generated_on.format("%d/%m/%Y")
        );
        for line in std::iter::once(&headers).chain(cells.iter()) {
            let padded: Vec<String> = line
                .iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect();
            out.push_str(padded.join("  ").trim_end());
            out.push('\n');
        }
        out
    }
}
