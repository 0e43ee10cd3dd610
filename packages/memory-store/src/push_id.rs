//! Generated child keys.
//!
//! A push id is 20 characters: 8 encoding the creation time in milliseconds,
//! then 12 random ones. The alphabet is in ascending ASCII order, so ids sort
//! by creation time. Ids made within the same millisecond reuse the previous
//! random part incremented by one, which keeps them ordered and distinct.

use rand::Rng;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

/// Produces ordered, unique keys for `child_by_auto_id`.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last_time: i64,
    last_random: [u8; RANDOM_CHARS],
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new id stamped with the current time.
    pub fn next_id(&mut self) -> String {
        let now = chrono::Utc::now().timestamp_millis();
        self.generate(now, &mut rand::thread_rng())
    }

    /// A new id stamped with `now_ms`.
    ///
    /// A clock that moves backwards is treated as standing still, so ids stay
    /// ordered.
    pub fn generate(&mut self, now_ms: i64, rng: &mut impl Rng) -> String {
        let mut now = now_ms.max(self.last_time);

        if now == self.last_time && !self.increment_random() {
            now += 1;
            self.fill_random(rng);
        } else if now != self.last_time {
            self.fill_random(rng);
        }
        self.last_time = now;

        let mut id = [0u8; TIME_CHARS + RANDOM_CHARS];
        let mut t = now.max(0) as u64;
        for slot in id[..TIME_CHARS].iter_mut().rev() {
            *slot = PUSH_CHARS[(t % 64) as usize];
            t /= 64;
        }
        for (slot, digit) in id[TIME_CHARS..].iter_mut().zip(self.last_random) {
            *slot = PUSH_CHARS[digit as usize];
        }

        id.iter().map(|&b| b as char).collect()
    }

    fn fill_random(&mut self, rng: &mut impl Rng) {
        for digit in self.last_random.iter_mut() {
            *digit = rng.gen_range(0..64);
        }
    }

    /// Add one to the random part. Returns false on overflow.
    fn increment_random(&mut self) -> bool {
        for digit in self.last_random.iter_mut().rev() {
            if *digit < 63 {
                *digit += 1;
                return true;
            }
            *digit = 0;
        }
        false
    }
}
