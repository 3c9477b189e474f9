//! IdGenerator port - 操作 ID 生成の抽象化
//!
//! ID は enqueue 時に払い出す。テストで時刻を固定できるよう Clock を注入する。

use std::sync::Mutex;

use ulid::Ulid;

use crate::domain::OperationId;
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn generate_operation_id(&self) -> OperationId;
}

/// ULID ids stamped from the injected clock.
///
/// Ids issued within the same millisecond (or under a clock that does not
/// move) are bumped past the previous one, so ids never go backwards.
pub struct UlidGenerator<C> {
    clock: C,
    last: Mutex<Option<Ulid>>,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            last: Mutex::new(None),
        }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_operation_id(&self) -> OperationId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        let candidate = Ulid::from_parts(timestamp_ms, rand::random());

        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let next = match *last {
            Some(prev) if candidate <= prev => prev.increment().unwrap_or(candidate),
            _ => candidate,
        };
        *last = Some(next);
        OperationId::from_ulid(next)
    }
}
