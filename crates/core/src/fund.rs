use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::domain::revenue::RevenueEntry;

/// Which ledger entries count toward the payout thresholds.
///
/// `AllTime` matches the behavior the console has always had; `RollingDays`
/// is the window the configuration has always promised. Keeping the window an
/// explicit parameter lets the rolling policy be switched on at the call site
/// without touching the evaluation itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConversionWindow {
    #[default]
    AllTime,
    RollingDays(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundPolicy {
    pub threshold_amount: Decimal,
    pub threshold_count: u64,
    pub window: ConversionWindow,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundStatus {
    pub balance: Decimal,
    pub conversions: u64,
    pub ready: bool,
}

impl FundPolicy {
    pub fn new(threshold_amount: Decimal, threshold_count: u64) -> Self {
        Self { threshold_amount, threshold_count, window: ConversionWindow::AllTime }
    }

    pub fn with_window(mut self, window: ConversionWindow) -> Self {
        self.window = window;
        self
    }

    /// Pure evaluation over the ledger: ready when both the allocated balance
    /// and the conversion count meet their thresholds within the window.
    pub fn evaluate(&self, ledger: &[RevenueEntry], now: DateTime<Utc>) -> FundStatus {
        let cutoff = match self.window {
            ConversionWindow::AllTime => None,
            ConversionWindow::RollingDays(days) => Some(now - Duration::days(i64::from(days))),
        };

        let mut balance = Decimal::ZERO;
        let mut conversions = 0u64;
        for entry in ledger {
            if let Some(cutoff) = cutoff {
                if entry.timestamp < cutoff {
                    continue;
                }
            }
            balance += entry.pro_fund_allocation;
            conversions += 1;
        }

        let ready = balance >= self.threshold_amount && conversions >= self.threshold_count;
        FundStatus { balance, conversions, ready }
    }
}
