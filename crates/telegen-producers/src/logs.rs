//! ECS-formatted application log lines

use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use telegen_core::{Accumulator, GenerateError, Producer};

use crate::random;

static SERVICES: &[&str] = &["checkout", "payments", "inventory", "auth", "search"];
static ORIGIN_FILES: &[&str] = &["handler.rs", "service.rs", "client.rs", "worker.rs"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogsSettings {
    /// Lower bound on message length in bytes
    pub min_message: usize,
    /// Upper bound on the target message length in bytes
    pub max_message: usize,
}

impl Default for LogsSettings {
    fn default() -> Self {
        Self {
            min_message: 20,
            max_message: 120,
        }
    }
}

#[derive(Serialize)]
struct LogOrigin<'a> {
    #[serde(rename = "file.name")]
    file_name: &'a str,
    #[serde(rename = "file.line")]
    file_line: u32,
}

#[derive(Serialize)]
struct EcsLine<'a> {
    #[serde(rename = "@timestamp")]
    timestamp: String,
    #[serde(rename = "log.level")]
    level: &'a str,
    message: String,
    #[serde(rename = "ecs.version")]
    ecs_version: &'a str,
    #[serde(rename = "service.name")]
    service: &'a str,
    #[serde(rename = "trace.id")]
    trace_id: String,
    #[serde(rename = "log.origin")]
    origin: LogOrigin<'a>,
}

/// Mostly info, some warn and debug, occasional error
fn level(rng: &mut SmallRng) -> &'static str {
    match rng.random_range(0..100) {
        0..=69 => "info",
        70..=84 => "debug",
        85..=94 => "warn",
        _ => "error",
    }
}

pub struct LogsProducer {
    acc: Accumulator,
    rng: SmallRng,
    settings: LogsSettings,
    line: Vec<u8>,
}

impl LogsProducer {
    pub fn new(settings: LogsSettings, rng: SmallRng) -> Self {
        let max_message = settings.max_message.max(settings.min_message);
        Self {
            acc: Accumulator::new(),
            rng,
            settings: LogsSettings {
                max_message,
                ..settings
            },
            line: Vec::with_capacity(512),
        }
    }
}

impl Producer for LogsProducer {
    fn generate(&mut self) -> Result<u64, GenerateError> {
        let rng = &mut self.rng;
        let target = rng.random_range(self.settings.min_message..=self.settings.max_message);
        let entry = EcsLine {
            timestamp: random::iso8601_now(),
            level: level(rng),
            message: random::phrase_text(rng, target),
            ecs_version: "1.6.0",
            service: random::pick(rng, SERVICES),
            trace_id: random::hex_string(rng, 32),
            origin: LogOrigin {
                file_name: random::pick(rng, ORIGIN_FILES),
                file_line: rng.random_range(1..500),
            },
        };

        self.line.clear();
        serde_json::to_writer(&mut self.line, &entry)?;
        self.line.push(b'\n');
        self.acc.write(&self.line);
        Ok(self.acc.size())
    }

    fn drain_and_reset(&mut self) -> Vec<u8> {
        self.acc.drain_and_reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn producer(settings: LogsSettings) -> LogsProducer {
        LogsProducer::new(settings, SmallRng::seed_from_u64(1))
    }

    #[test]
    fn emits_ecs_fields() {
        let mut p = producer(LogsSettings::default());
        p.generate().unwrap();
        let out = p.drain_and_reset();
        let v: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert!(v["@timestamp"].as_str().unwrap().ends_with('Z'));
        assert!(["info", "debug", "warn", "error"].contains(&v["log.level"].as_str().unwrap()));
        assert_eq!(v["ecs.version"], "1.6.0");
        assert_eq!(v["trace.id"].as_str().unwrap().len(), 32);
        assert!(v["message"].as_str().unwrap().len() >= 20);
        assert!(v["log.origin"]["file.line"].as_u64().unwrap() >= 1);
    }

    #[test]
    fn one_line_per_generate() {
        let mut p = producer(LogsSettings::default());
        let mut last = 0;
        for _ in 0..10 {
            let size = p.generate().unwrap();
            assert!(size > last);
            last = size;
        }
        let out = p.drain_and_reset();
        assert_eq!(out.len() as u64, last);
        assert_eq!(out.iter().filter(|&&b| b == b'\n').count(), 10);
    }

    #[test]
    fn inverted_bounds_are_tolerated() {
        let mut p = producer(LogsSettings {
            min_message: 50,
            max_message: 10,
        });
        p.generate().unwrap();
        let v: serde_json::Value = serde_json::from_slice(&p.drain_and_reset()).unwrap();
        assert!(v["message"].as_str().unwrap().len() >= 50);
    }
}
