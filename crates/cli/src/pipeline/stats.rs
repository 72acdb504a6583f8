//! Pipeline statistics and metrics.

use std::time::Duration;

use ingestion::MetricsSnapshot as IngestionSnapshot;
use observability::StatsSummary;
use router::MetricsSnapshot as SinkSnapshot;

use super::StopReason;

/// Statistics from a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub stop_reason: StopReason,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Frames taken off the event queue by the consumer
    pub frames_handled: u64,

    /// Ingestion counters at shutdown
    pub ingestion: IngestionSnapshot,

    /// Complete routes at shutdown, synthesized ones included
    pub routes: usize,

    pub advertised_channels: usize,

    /// Transform entries skipped as malformed
    pub rejected_entries: usize,

    /// Per-sink counters after the final flush
    pub sinks: Vec<(String, SinkSnapshot)>,

    /// Event queue depth sampled by the watchdog
    pub queue_depth: StatsSummary,
}

impl PipelineStats {
    /// Published point frames per second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ingestion.frames_published as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Messages refused by any sink queue, all kinds
    pub fn sink_drops(&self) -> u64 {
        self.sinks.iter().map(|(_, sink)| sink.dropped.total()).sum()
    }

    /// Frames dropped at the event queue, as a percentage of frames received
    pub fn drop_rate(&self) -> f64 {
        if self.ingestion.frames_received > 0 {
            (self.ingestion.frames_dropped as f64 / self.ingestion.frames_received as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        let ingestion = &self.ingestion;

        println!("\n=== Pipeline Statistics ===\n");

        println!("Overview");
        println!("   ├─ Stopped by: {:?}", self.stop_reason);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Frames handled: {}", self.frames_handled);
        println!("   ├─ FPS: {:.2}", self.fps());
        println!("   ├─ Routes: {}", self.routes);
        println!("   ├─ Advertised channels: {}", self.advertised_channels);
        println!("   └─ Rejected transform entries: {}", self.rejected_entries);

        println!("\nIngestion");
        println!("   ├─ Frames received: {}", ingestion.frames_received);
        println!(
            "   ├─ Frames dropped: {} ({:.2}%)",
            ingestion.frames_dropped,
            self.drop_rate()
        );
        println!("   ├─ Point frames published: {}", ingestion.frames_published);
        println!("   ├─ Points published: {}", ingestion.points_published);
        println!("   ├─ Status messages published: {}", ingestion.status_published);
        println!("   ├─ Status query failures: {}", ingestion.status_failures);
        println!("   ├─ Publish failures: {}", ingestion.publish_failures);
        println!("   ├─ Channels synthesized: {}", ingestion.routes_synthesized);
        println!("   └─ Event queue depth: {}", self.queue_depth);

        if !self.sinks.is_empty() {
            println!("\nSinks (total dropped: {})", self.sink_drops());
            let last = self.sinks.len() - 1;
            for (i, (name, sink)) in self.sinks.iter().enumerate() {
                let (branch, stem) = if i == last {
                    ("└─", "   ")
                } else {
                    ("├─", "│  ")
                };
                println!("   {} {}", branch, name);
                println!("   {}  ├─ Written: {}", stem, sink.written);
                println!("   {}  ├─ Failed: {}", stem, sink.failed);
                println!("   {}  └─ Dropped: {}", stem, sink.dropped);
            }
        }

        println!();
    }
}
