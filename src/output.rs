//! Rendering of feed pages.
//!
//! Supports pretty-printing, JSON serialization, and CSV rows.

use std::io::Write;

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use tracing::debug;

use crate::model::{EntityKind, FeedEntity};
use crate::service::FeedPage;

/// One flattened CSV row per entity.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct EntityRow<'a> {
    pub entity_id: &'a str,
    pub entity_type: &'static str,
    pub trip_id: Option<&'a str>,
    pub route_id: Option<&'a str>,
    /// Current stop for vehicles, first predicted stop for trip updates.
    pub stop_id: Option<&'a str>,
    pub stop_count: usize,
    pub timestamp: Option<u64>,
    pub header_text: Option<&'a str>,
}

impl<'a> From<&'a FeedEntity> for EntityRow<'a> {
    fn from(entity: &'a FeedEntity) -> Self {
        let trip = entity.trip();
        let mut row = EntityRow {
            entity_id: &entity.id,
            entity_type: entity.entity_type().as_str(),
            trip_id: trip.map(|t| t.trip_id.as_str()),
            route_id: trip.map(|t| t.route_id.as_str()),
            stop_id: None,
            stop_count: 0,
            timestamp: None,
            header_text: None,
        };

        match &entity.kind {
            EntityKind::Alert(alert) => {
                row.header_text = alert.header_text.first().map(|t| t.text.as_str());
            }
            EntityKind::TripUpdate(update) => {
                row.stop_id = update
                    .stop_time_updates
                    .iter()
                    .find_map(|stu| stu.stop_id.as_deref());
                row.stop_count = update.stop_time_updates.len();
            }
            EntityKind::Vehicle(vehicle) => {
                row.stop_id = Some(&vehicle.stop_id);
                row.stop_count = 1;
                row.timestamp = Some(vehicle.timestamp);
            }
        }

        row
    }
}

/// Writes a page using Rust's debug pretty-print format, preceded by the
/// feed's generation time when it is representable.
pub fn write_pretty<W: Write>(mut writer: W, page: &FeedPage) -> Result<()> {
    if let Some(generated_at) = page.header.generated_at() {
        writeln!(writer, "# feed generated at {}", generated_at.to_rfc3339())?;
    }
    writeln!(writer, "{page:#?}")?;
    Ok(())
}

/// Writes a page as pretty-printed JSON followed by a newline.
pub fn write_json<W: Write>(mut writer: W, page: &FeedPage) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, page)?;
    writeln!(writer)?;
    Ok(())
}

/// Writes one CSV row per entity of `page`, with a header row.
pub fn write_csv<W: Write>(writer: W, page: &FeedPage) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);

    for entity in &page.page.items {
        writer.serialize(EntityRow::from(entity))?;
    }
    writer.flush()?;

    debug!(rows = page.page.items.len(), "Wrote CSV rows");
    Ok(())
}
