//! CloudWatch metric-stream JSON lines

use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use telegen_core::{Accumulator, GenerateError, Producer};

use crate::random;

static METRICS: &[(&str, &str)] = &[
    ("DiskWriteOps", "Count"),
    ("DiskReadOps", "Count"),
    ("CPUUtilization", "Percent"),
    ("NetworkIn", "Bytes"),
    ("NetworkOut", "Bytes"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub region: String,
    pub account_id: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            account_id: "111111111111".to_string(),
        }
    }
}

#[derive(Serialize)]
struct Dimensions {
    #[serde(rename = "InstanceId")]
    instance_id: String,
}

#[derive(Serialize)]
struct Value {
    count: u32,
    sum: u32,
    max: u32,
    min: u32,
}

#[derive(Serialize)]
struct MetricLine<'a> {
    metric_stream_name: &'a str,
    account_id: &'a str,
    region: &'a str,
    namespace: &'a str,
    metric_name: &'a str,
    dimensions: Dimensions,
    timestamp: i64,
    value: Value,
    unit: &'a str,
}

pub struct MetricsProducer {
    acc: Accumulator,
    rng: SmallRng,
    settings: MetricsSettings,
    instances: Vec<String>,
    line: Vec<u8>,
}

impl MetricsProducer {
    pub fn new(settings: MetricsSettings, mut rng: SmallRng) -> Self {
        // A small fixed fleet per producer, like a real account
        let instances = (0..4)
            .map(|_| format!("i-{}", random::hex_string(&mut rng, 17)))
            .collect();
        Self {
            acc: Accumulator::new(),
            rng,
            settings,
            instances,
            line: Vec::with_capacity(256),
        }
    }
}

impl Producer for MetricsProducer {
    fn generate(&mut self) -> Result<u64, GenerateError> {
        let rng = &mut self.rng;
        let (metric_name, unit) = METRICS[rng.random_range(0..METRICS.len())];
        let instance = &self.instances[rng.random_range(0..self.instances.len())];

        let min = rng.random_range(0..50);
        let max = rng.random_range(min..100);
        let count = rng.random_range(1..20);
        let entry = MetricLine {
            metric_stream_name: "AWSMetrics",
            account_id: &self.settings.account_id,
            region: &self.settings.region,
            namespace: "AWS/EC2",
            metric_name,
            dimensions: Dimensions {
                instance_id: instance.clone(),
            },
            timestamp: random::unix_seconds(0),
            value: Value {
                count,
                sum: count * (min + max) / 2,
                max,
                min,
            },
            unit,
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

    #[test]
    fn emits_metric_stream_shape() {
        let settings = MetricsSettings {
            region: "eu-west-1".to_string(),
            ..MetricsSettings::default()
        };
        let mut p = MetricsProducer::new(settings, SmallRng::seed_from_u64(3));
        p.generate().unwrap();
        let v: serde_json::Value = serde_json::from_slice(&p.drain_and_reset()).unwrap();

        assert_eq!(v["metric_stream_name"], "AWSMetrics");
        assert_eq!(v["region"], "eu-west-1");
        assert_eq!(v["account_id"], "111111111111");
        assert_eq!(v["namespace"], "AWS/EC2");
        assert!(v["dimensions"]["InstanceId"].as_str().unwrap().starts_with("i-"));
        assert!(v["timestamp"].as_i64().unwrap() > 1_600_000_000);
        let value = &v["value"];
        assert!(value["min"].as_u64().unwrap() <= value["max"].as_u64().unwrap());
    }

    #[test]
    fn size_matches_drained_bytes() {
        let mut p = MetricsProducer::new(MetricsSettings::default(), SmallRng::seed_from_u64(3));
        let mut size = 0;
        for _ in 0..5 {
            size = p.generate().unwrap();
        }
        let out = p.drain_and_reset();
        assert_eq!(out.len() as u64, size);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 5);
    }
}
