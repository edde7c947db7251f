//! Reference host: in-memory capabilities wired together with request-level
//! atomicity. Tests drive the whole engine through this.

use super::{Dex, HostState};
use crate::dex::errors::Result;
use crate::ledger::{
    AccountId, BufferedLogger, FixedClock, InMemoryLedger, InMemoryTokenLedger, Logger,
    ObjectStore, TokenLedger, TxClock,
};

pub struct InMemoryHost {
    pub ledger: InMemoryLedger,
    pub tokens: InMemoryTokenLedger,
    pub logger: BufferedLogger,
    pub clock: FixedClock,
    pub caller: AccountId,
    /// Number of cooperative yields observed from the swap stepper.
    pub checkpoints: u32,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self {
            ledger: InMemoryLedger::new(),
            tokens: InMemoryTokenLedger::new(),
            logger: BufferedLogger::new(),
            clock: FixedClock(0),
            caller: AccountId::new(),
            checkpoints: 0,
        }
    }

    /// Runs one request as `caller`. On error every ledger and subledger
    /// effect is rolled back and events raised by the request are dropped,
    /// so nothing externalises before commit.
    pub fn transact<R>(
        &mut self,
        caller: &str,
        request_fn: impl FnOnce(&mut Dex<'_, Self>) -> Result<R>,
    ) -> Result<R> {
        let ledger_snapshot = self.ledger.clone();
        let tokens_snapshot = self.tokens.clone();
        let events_mark = self.logger.events.len();
        self.caller = caller.to_string();

        let result = request_fn(&mut Dex::new(self));
        if result.is_err() {
            self.ledger = ledger_snapshot;
            self.tokens = tokens_snapshot;
            self.logger.events.truncate(events_mark);
        }
        result
    }
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostState for InMemoryHost {
    fn ledger(&self) -> &dyn ObjectStore {
        &self.ledger
    }

    fn ledger_mut(&mut self) -> &mut dyn ObjectStore {
        &mut self.ledger
    }

    fn tokens(&self) -> &dyn TokenLedger {
        &self.tokens
    }

    fn tokens_mut(&mut self) -> &mut dyn TokenLedger {
        &mut self.tokens
    }

    fn logger_mut(&mut self) -> &mut dyn Logger {
        &mut self.logger
    }

    fn clock(&self) -> &dyn TxClock {
        &self.clock
    }

    fn caller(&self) -> AccountId {
        self.caller.clone()
    }

    fn checkpoint(&mut self) {
        self.checkpoints += 1;
    }
}
