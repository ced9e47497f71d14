//! Proposal validation.
//!
//! Every tier is checked against the base (recommended) calculation before a
//! proposal leaves the engine:
//!
//! - **Scale ceilings**: tier energy, power, solar and generator may not
//!   exceed the base by more than the configured factor.
//! - **Positivity**: energy, power, total cost and annual savings must be
//!   positive.
//! - **Financial round-trip**: cost and savings totals must add up, the ITC
//!   is recomputed from the cost breakdown at the scenario's rate, and net
//!   cost, payback and ROI must agree with it within tolerance.
//!
//! Validation is a single deterministic pass. A proposal is either
//! authenticated with every check attached, or rejected with the failed
//! checks listed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::PricingScenario;
use crate::calculations::common::{ratio, round_half_up};
use crate::calculations::financial::{FinancialMetrics, ROI_HORIZON_YEARS};
use crate::calculations::sizing::{SystemConfiguration, Tier};

/// A sized and priced system for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub tier: Tier,
    pub system: SystemConfiguration,
    pub financials: FinancialMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub max_bess_scale: Decimal,
    pub max_power_scale: Decimal,
    pub max_solar_scale: Decimal,
    pub max_generator_scale: Decimal,
    pub payback_tolerance_years: Decimal,
    pub roi_tolerance_points: Decimal,
    /// Relative tolerance on the ITC amount.
    pub itc_tolerance: Decimal,
    pub net_cost_tolerance: Decimal,
    /// ITC rate of the pricing scenario the proposal was priced with. The
    /// rate carried by the proposal itself is never trusted.
    pub itc_rate: Decimal,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_bess_scale: Decimal::new(25, 1),
            max_power_scale: Decimal::new(25, 1),
            max_solar_scale: Decimal::from(3),
            max_generator_scale: Decimal::from(2),
            payback_tolerance_years: Decimal::ONE,
            roi_tolerance_points: Decimal::from(5),
            itc_tolerance: Decimal::new(1, 2),
            net_cost_tolerance: Decimal::ONE,
            itc_rate: PricingScenario::fallback().itc_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// `None` for checks on the base calculation.
    pub tier: Option<Tier>,
    pub check: String,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedProposal {
    pub base: Proposal,
    pub tiers: Vec<Proposal>,
    pub checks: Vec<CheckResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Authenticated(AuthenticatedProposal),
    Rejected { failures: Vec<CheckResult> },
}

impl ValidationOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Failed checks; empty when authenticated.
    pub fn failures(&self) -> &[CheckResult] {
        match self {
            Self::Authenticated(_) => &[],
            Self::Rejected { failures } => failures,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProposalValidator {
    config: ValidatorConfig,
}

impl ProposalValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn with_itc_rate(
        mut self,
        itc_rate: Decimal,
    ) -> Self {
        self.config.itc_rate = itc_rate;
        self
    }

    pub fn validate(
        &self,
        base: &Proposal,
        tiers: &[Proposal],
    ) -> ValidationOutcome {
        let mut checks = vec![positive(None, "base_energy_kwh", base.system.bess_kwh)];

        for proposal in tiers {
            self.check_tier(base, proposal, &mut checks);
        }

        let failures: Vec<CheckResult> = checks.iter().filter(|c| !c.passed).cloned().collect();
        if failures.is_empty() {
            debug!(checks = checks.len(), "proposal authenticated");
            ValidationOutcome::Authenticated(AuthenticatedProposal {
                base: base.clone(),
                tiers: tiers.to_vec(),
                checks,
            })
        } else {
            for failure in &failures {
                warn!(
                    tier = ?failure.tier,
                    check = %failure.check,
                    detail = %failure.detail,
                    "proposal check failed"
                );
            }
            ValidationOutcome::Rejected { failures }
        }
    }

    fn check_tier(
        &self,
        base: &Proposal,
        proposal: &Proposal,
        checks: &mut Vec<CheckResult>,
    ) {
        let tier = Some(proposal.tier);
        let c = &self.config;
        let (b, s) = (&base.system, &proposal.system);
        let f = &proposal.financials;

        checks.extend(scale(tier, "bess_scale", s.bess_kwh, b.bess_kwh, c.max_bess_scale));
        checks.extend(scale(tier, "power_scale", s.bess_kw, b.bess_kw, c.max_power_scale));
        checks.extend(scale(tier, "solar_scale", s.solar_kw, b.solar_kw, c.max_solar_scale));
        checks.extend(scale(
            tier,
            "generator_scale",
            s.generator_kw,
            b.generator_kw,
            c.max_generator_scale,
        ));

        checks.push(positive(tier, "energy_kwh", s.bess_kwh));
        checks.push(positive(tier, "bess_kw", s.bess_kw));
        checks.push(positive(tier, "total_cost", f.costs.total_cost));
        checks.push(positive(tier, "annual_savings", f.annual_savings));

        checks.push(cost_total_check(tier, f));
        checks.push(savings_total_check(tier, f));
        checks.push(self.payback_check(tier, f));
        checks.push(self.roi_check(tier, f));
        checks.push(self.itc_check(tier, f));
        checks.push(self.net_cost_check(tier, f));
    }

    fn payback_check(
        &self,
        tier: Option<Tier>,
        f: &FinancialMetrics,
    ) -> CheckResult {
        let expected = if f.annual_savings > Decimal::ZERO {
            ratio(f.net_cost, f.annual_savings)
        } else {
            None
        };
        within(
            tier,
            "payback_years",
            f.payback_years,
            expected,
            self.config.payback_tolerance_years,
        )
    }

    fn roi_check(
        &self,
        tier: Option<Tier>,
        f: &FinancialMetrics,
    ) -> CheckResult {
        let expected = if f.net_cost > Decimal::ZERO {
            ratio(f.annual_savings * ROI_HORIZON_YEARS - f.net_cost, f.net_cost)
                .map(|r| r * Decimal::ONE_HUNDRED)
        } else {
            None
        };
        within(
            tier,
            "roi_percent",
            f.roi_percent,
            expected,
            self.config.roi_tolerance_points,
        )
    }

    /// ITC the cost breakdown supports: BESS and solar cost grossed up by
    /// the installation share, at the scenario's rate.
    fn expected_itc(
        &self,
        f: &FinancialMetrics,
    ) -> Decimal {
        let c = &f.costs;
        let installation_share = ratio(c.installation_cost, c.equipment_cost).unwrap_or_default();
        (c.bess_cost + c.solar_cost) * (Decimal::ONE + installation_share) * self.config.itc_rate
    }

    fn itc_check(
        &self,
        tier: Option<Tier>,
        f: &FinancialMetrics,
    ) -> CheckResult {
        let expected = self.expected_itc(f);
        let tolerance = (expected * self.config.itc_tolerance).abs();
        within(tier, "itc_amount", Some(f.itc_amount), Some(expected), tolerance)
    }

    fn net_cost_check(
        &self,
        tier: Option<Tier>,
        f: &FinancialMetrics,
    ) -> CheckResult {
        let itc = self.expected_itc(f);
        let tolerance = self.config.net_cost_tolerance + (itc * self.config.itc_tolerance).abs();
        let expected = f.costs.total_cost - itc;
        within(
            tier,
            "net_cost",
            Some(f.net_cost),
            Some(expected),
            tolerance,
        )
    }
}

fn cost_total_check(
    tier: Option<Tier>,
    f: &FinancialMetrics,
) -> CheckResult {
    let c = &f.costs;
    let equipment = c.bess_cost + c.solar_cost + c.generator_cost;
    CheckResult {
        tier,
        check: "cost_total".to_string(),
        passed: c.equipment_cost == equipment && c.total_cost == equipment + c.installation_cost,
        detail: format!(
            "total {} = equipment {} + installation {}",
            c.total_cost, equipment, c.installation_cost
        ),
    }
}

fn savings_total_check(
    tier: Option<Tier>,
    f: &FinancialMetrics,
) -> CheckResult {
    let s = &f.savings;
    let total = s.demand_charge + s.arbitrage + s.solar;
    CheckResult {
        tier,
        check: "savings_total".to_string(),
        passed: s.total == total && f.annual_savings == total,
        detail: format!("annual {} = parts {}", f.annual_savings, total),
    }
}

/// `None` when neither side has any of this equipment.
fn scale(
    tier: Option<Tier>,
    check: &str,
    value: Decimal,
    base: Decimal,
    ceiling: Decimal,
) -> Option<CheckResult> {
    if base.is_zero() && value.is_zero() {
        return None;
    }
    let result = match ratio(value, base) {
        Some(r) => CheckResult {
            tier,
            check: check.to_string(),
            passed: r <= ceiling,
            detail: format!("{} × base (max {})", round_half_up(r), ceiling),
        },
        None => CheckResult {
            tier,
            check: check.to_string(),
            passed: false,
            detail: format!("{} with no base to scale from", value),
        },
    };
    Some(result)
}

fn positive(
    tier: Option<Tier>,
    check: &str,
    value: Decimal,
) -> CheckResult {
    CheckResult {
        tier,
        check: check.to_string(),
        passed: value > Decimal::ZERO,
        detail: format!("{} > 0", value),
    }
}

fn within(
    tier: Option<Tier>,
    check: &str,
    reported: Option<Decimal>,
    expected: Option<Decimal>,
    tolerance: Decimal,
) -> CheckResult {
    let (passed, detail) = match (reported, expected) {
        (Some(r), Some(e)) => (
            (r - e).abs() <= tolerance,
            format!("reported {} expected {} (±{})", r, round_half_up(e), tolerance),
        ),
        (None, None) => (true, "not applicable".to_string()),
        (Some(r), None) => (false, format!("reported {} expected none", r)),
        (None, Some(e)) => (false, format!("reported none expected {}", round_half_up(e))),
    };
    CheckResult {
        tier,
        check: check.to_string(),
        passed,
        detail,
    }
}
