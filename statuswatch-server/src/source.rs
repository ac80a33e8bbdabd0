use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statuswatch_shared::{Record, Snapshot};

pub const STATUSES: [&str; 3] = ["OK", "NOT OK", "MAINTENANCE"];

/// Shape of the generated listings.
#[derive(Debug, Clone, Copy)]
pub struct SourceShape {
    pub min_records: usize,
    pub max_records: usize,
    /// Regenerate the listing on every n-th request.
    pub regenerate_every: u64,
}

impl Default for SourceShape {
    fn default() -> Self {
        Self {
            min_records: 10,
            max_records: 20,
            regenerate_every: 2,
        }
    }
}

/// Demo record source: serves the same listing until it is time to roll a new one.
pub struct DemoSource {
    shape: SourceShape,
    rng: StdRng,
    data: Snapshot,
    requests: u64,
}

impl DemoSource {
    pub fn new(shape: SourceShape, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Self {
            shape,
            rng,
            data: Snapshot::empty(),
            requests: 0,
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Account one request and return the listing to serve for it.
    pub fn next_listing(&mut self) -> Snapshot {
        self.requests += 1;
        let every = self.shape.regenerate_every.max(1);
        if self.requests % every == 0 || self.data.is_empty() {
            self.data = self.generate();
            tracing::debug!(
                request = self.requests,
                records = self.data.len(),
                "regenerated listing"
            );
        }
        self.data.clone()
    }

    fn generate(&mut self) -> Snapshot {
        let lo = self.shape.min_records.max(1);
        let hi = self.shape.max_records.max(lo);
        let count = self.rng.random_range(lo..=hi);
        (1..=count)
            .map(|n| {
                let status = STATUSES[self.rng.random_range(0..STATUSES.len())];
                Record::new(n as i64, format!("Node_{n}"), status)
            })
            .collect()
    }
}
