// src/services/id_generator.rs
use chrono::Utc;
use uuid::Uuid;

const SUFFIX_LEN: usize = 9;

/// Produces the user ids attached to consent records: `user_<unix millis>_<random suffix>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserIdGenerator;

impl UserIdGenerator {
    pub const fn new() -> Self {
        Self
    }

    pub fn next_id(&self) -> String {
        let millis = Utc::now().timestamp_millis();
        let random = Uuid::new_v4().simple().to_string();
        format!("user_{}_{}", millis, &random[..SUFFIX_LEN])
    }
}
