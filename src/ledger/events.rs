//! Structured event records emitted by the core.
//!
//! The `Logger` capability hides how the host publishes events; the shipped
//! [`BufferedLogger`] collects them per request so the host can flush on
//! commit and drop on abort. Amounts are rendered as decimal strings in the
//! serialized form.

use serde::Serialize;

use super::{AccountId, BasisPoints, TokenClassKey};

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "event", content = "data")]
pub enum Event {
    PoolCreated {
        creator: AccountId,
        token0: TokenClassKey,
        token1: TokenClassKey,
        fee: BasisPoints,
        sqrt_price: String,
    },
    Minted {
        owner: AccountId,
        pool_hash: String,
        position_id: String,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: String,
        amounts: (String, String),
    },
    Burned {
        owner: AccountId,
        pool_hash: String,
        position_id: String,
        liquidity: String,
        amounts: (String, String),
    },
    Swapped {
        user: AccountId,
        pool_hash: String,
        amount0: String,
        amount1: String,
        sqrt_price: String,
    },
    FeesCollected {
        owner: AccountId,
        pool_hash: String,
        position_id: String,
        amounts: (String, String),
    },
    ProtocolFeesCollected {
        recipient: AccountId,
        pool_hash: String,
        amounts: (String, String),
    },
    LimitOrderPlaced {
        commitment_id: String,
        expires: u64,
    },
    LimitOrderCancelled {
        commitment_id: String,
    },
    LimitOrderFilled {
        commitment_id: String,
        quantity_bought: String,
    },
    EmergencyPause {
        account: AccountId,
    },
    EmergencyResume {
        account: AccountId,
    },
}

/// Event sink capability; one implementation per host.
pub trait Logger {
    fn log(&mut self, args: std::fmt::Arguments<'_>);
    fn log_event(&mut self, event: Event);
}

/// Collects events and plain log lines in memory.
#[derive(Default)]
pub struct BufferedLogger {
    pub events: Vec<Event>,
    pub lines: Vec<String>,
}

impl BufferedLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialized form the host would publish, one JSON record per event.
    pub fn drain_json(&mut self) -> Vec<String> {
        self.events
            .drain(..)
            .map(|event| {
                let Ok(json) = serde_json::to_string(&event) else {
                    unreachable!()
                };
                format!("EVENT_JSON:{json}")
            })
            .collect()
    }
}

impl Logger for BufferedLogger {
    fn log(&mut self, args: std::fmt::Arguments<'_>) {
        self.lines.push(std::fmt::format(args));
    }

    fn log_event(&mut self, event: Event) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_tagged() {
        let mut logger = BufferedLogger::new();
        logger.log_event(Event::EmergencyPause {
            account: "guard".into(),
        });
        let lines = logger.drain_json();
        assert_eq!(
            lines,
            [r#"EVENT_JSON:{"event":"emergency_pause","data":{"account":"guard"}}"#]
        );
        assert!(logger.events.is_empty());
    }
}
