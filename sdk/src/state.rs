//! On-chain account layouts of the lowcapfun program

use anchor_lang::prelude::*;
use std::fmt;

use crate::error::{LowcapfunError, LowcapfunResult};

/// Per-launch bonding curve configuration, stored at the config PDA
#[account]
#[derive(Debug, PartialEq, Eq)]
pub struct BondingConfig {
    pub token_mint: Pubkey,
    pub total_supply: u64,
    pub curve_type: u8,
    pub bump: u8,
    pub tokens_sold: u64,
    pub launch_timestamp: i64,
}

impl BondingConfig {
    /// Account size including the 8 byte discriminator
    pub const SPACE: usize = 8 + 32 + 8 + 1 + 1 + 8 + 8;

    /// A launch stays alive this long after launch regardless of sales
    pub const ALIVE_WINDOW_SECS: i64 = 86_400;

    /// Past the window, a launch stays alive once this share has sold
    pub const ALIVE_SOLD_PERCENT: u64 = 70;

    /// Decode raw account data, checking the account discriminator
    pub fn decode(address: &Pubkey, data: &[u8]) -> LowcapfunResult<Self> {
        let mut slice = data;
        Self::try_deserialize(&mut slice).map_err(|e| LowcapfunError::AccountDecode {
            address: *address,
            reason: e.to_string(),
        })
    }

    pub fn curve(&self) -> LowcapfunResult<CurveType> {
        CurveType::try_from(self.curve_type)
    }

    /// Share of the supply sold so far, in whole percent
    pub fn sold_percent(&self) -> u64 {
        if self.total_supply == 0 {
            return 0;
        }
        (u128::from(self.tokens_sold) * 100 / u128::from(self.total_supply)) as u64
    }

    /// Whether the launch is alive at unix time `now`.
    ///
    /// Only time bomb launches act on this: buying a dead one fails with
    /// `TokenSelfDestructed`, nuking a live one with `TokenStillAlive`.
    pub fn is_alive(&self, now: i64) -> bool {
        now.saturating_sub(self.launch_timestamp) < Self::ALIVE_WINDOW_SECS
            || self.sold_percent() >= Self::ALIVE_SOLD_PERCENT
    }

    /// Whether `nuke_token` would be accepted at unix time `now`
    pub fn can_nuke(&self, now: i64) -> bool {
        self.curve_type == CurveType::TimeBomb.code() && !self.is_alive(now)
    }

    /// Current price per token in lamports
    pub fn price(&self) -> LowcapfunResult<u64> {
        self.curve()?.price(self.tokens_sold)
    }

    /// Lamports exchanged for `amount` tokens at the current price
    pub fn quote(&self, amount: u64) -> LowcapfunResult<u64> {
        self.price()?
            .checked_mul(amount)
            .ok_or_else(|| LowcapfunError::invalid_input(format!("price of {amount} tokens overflows u64")))
    }
}

/// Bonding curve selected at launch, encoded as a `u8` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CurveType {
    Linear = 0,
    Exponential = 1,
    Declining = 2,
    TimeBomb = 3,
}

impl CurveType {
    pub const ALL: [CurveType; 4] = [
        CurveType::Linear,
        CurveType::Exponential,
        CurveType::Declining,
        CurveType::TimeBomb,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Time bomb launches can be nuked once they stop being alive
    pub fn is_time_bomb(self) -> bool {
        self == CurveType::TimeBomb
    }

    /// Price per token in lamports after `tokens_sold` tokens have sold.
    ///
    /// The exponential curve grows 5% per thousand tokens and overflows
    /// u64 from 9 000 tokens sold; that is reported as `InvalidInput`.
    pub fn price(self, tokens_sold: u64) -> LowcapfunResult<u64> {
        let thousands = tokens_sold / 1_000;
        match self {
            CurveType::Linear => Ok(1_000 + thousands),
            CurveType::Exponential => {
                let overflow =
                    || LowcapfunError::invalid_input(format!("exponential price overflows at {tokens_sold} tokens sold"));
                let steps = u32::try_from(thousands).map_err(|_| overflow())?;
                let growth = 105u64.checked_pow(steps).ok_or_else(overflow)?;
                let scale = 100u64.checked_pow(steps).ok_or_else(overflow)?;
                Ok(1_000u64.checked_mul(growth).ok_or_else(overflow)? / scale)
            }
            CurveType::Declining => Ok(1_000u64.saturating_sub(tokens_sold / 10)),
            CurveType::TimeBomb => Ok(1_000),
        }
    }
}

impl TryFrom<u8> for CurveType {
    type Error = LowcapfunError;

    fn try_from(value: u8) -> LowcapfunResult<Self> {
        match value {
            0 => Ok(CurveType::Linear),
            1 => Ok(CurveType::Exponential),
            2 => Ok(CurveType::Declining),
            3 => Ok(CurveType::TimeBomb),
            other => Err(LowcapfunError::invalid_input(format!("Unknown curve type: {other}"))),
        }
    }
}

impl fmt::Display for CurveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CurveType::Linear => "linear",
            CurveType::Exponential => "exponential",
            CurveType::Declining => "declining",
            CurveType::TimeBomb => "time-bomb",
        };
        f.write_str(name)
    }
}
