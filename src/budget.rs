use solana_sdk::{compute_budget::ComputeBudgetInstruction, instruction::Instruction};

/// Smallest compute unit limit we ever request.
pub const COMPUTE_UNIT_FLOOR: u32 = 1_000;
/// Headroom added on top of the simulated consumption, in percent.
pub const COMPUTE_UNIT_MARGIN_PERCENT: u64 = 10;
/// Per-transaction ceiling enforced by the runtime.
pub const MAX_COMPUTE_UNIT_LIMIT: u32 = 1_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeBudgetPlan {
    /// Price in micro-lamports per compute unit.
    pub unit_price: u64,
    pub unit_limit: u32,
}

impl ComputeBudgetPlan {
    pub fn new(unit_price: u64, units_consumed: u64) -> Self {
        Self {
            unit_price,
            unit_limit: compute_unit_limit_with_margin(units_consumed),
        }
    }

    /// Price first, then limit; appended after the payload instructions.
    pub fn instructions(&self) -> [Instruction; 2] {
        [
            ComputeBudgetInstruction::set_compute_unit_price(self.unit_price),
            ComputeBudgetInstruction::set_compute_unit_limit(self.unit_limit),
        ]
    }
}

/// Raw estimates below the floor get the floor; anything else gets
/// `ceil(units * 1.1)`, capped at the runtime maximum.
pub fn compute_unit_limit_with_margin(units_consumed: u64) -> u32 {
    if units_consumed < COMPUTE_UNIT_FLOOR as u64 {
        return COMPUTE_UNIT_FLOOR;
    }
    let padded = units_consumed
        .saturating_mul(100 + COMPUTE_UNIT_MARGIN_PERCENT)
        .saturating_add(99)
        / 100;
    padded.min(MAX_COMPUTE_UNIT_LIMIT as u64) as u32
}
