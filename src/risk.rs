//! Credit risk scoring engine
//!
//! Pure and deterministic: no clock, no RNG, no I/O. The same input always
//! produces the same assessment, which is what makes risk decisions
//! reproducible and auditable after the fact.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Write;

/// Parameters of a credit operation under evaluation.
///
/// Expected domains: positive value, positive term, score in 0..=1000,
/// commitment ratio in 0.0..=1.0. Out-of-domain values are not rejected;
/// they fall into the nearest bracket and score monotonically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessmentInput {
    pub operation_value: f64,
    pub term_months: i64,
    pub client_score: i64,
    pub commitment_ratio: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskClassification {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl fmt::Display for RiskClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskClassification::Low => "LOW",
            RiskClassification::Medium => "MEDIUM",
            RiskClassification::High => "HIGH",
            RiskClassification::VeryHigh => "VERY_HIGH",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub risk_score: u32,
    pub classification: RiskClassification,
    pub recommendation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_monthly_rate: Option<f64>,
    pub factors: Vec<String>,
}

/// Score a credit operation.
///
/// Three additive factors, always evaluated in the same order (client score,
/// income commitment, term) so the justification list reads the same way for
/// every assessment. All boundaries are inclusive.
pub fn assess(input: &RiskAssessmentInput) -> RiskAssessment {
    let mut score: u32 = 0;
    let mut factors = Vec::with_capacity(3);

    if input.client_score >= 800 {
        score += 5;
        factors.push("client score excellent (+5)".to_string());
    } else if input.client_score >= 700 {
        score += 15;
        factors.push("client score good (+15)".to_string());
    } else if input.client_score >= 600 {
        score += 35;
        factors.push("client score fair (+35)".to_string());
    } else {
        score += 50;
        factors.push("client score poor (+50)".to_string());
    }

    if input.commitment_ratio <= 0.30 {
        score += 5;
        factors.push("income commitment low (+5)".to_string());
    } else if input.commitment_ratio <= 0.50 {
        score += 20;
        factors.push("income commitment moderate (+20)".to_string());
    } else {
        score += 40;
        factors.push("income commitment high (+40)".to_string());
    }

    if input.term_months <= 12 {
        score += 5;
        factors.push("short term (+5)".to_string());
    } else if input.term_months <= 36 {
        score += 10;
        factors.push("medium term (+10)".to_string());
    } else {
        score += 20;
        factors.push("long term (+20)".to_string());
    }

    let (classification, recommendation, suggested_monthly_rate) = if score <= 25 {
        (
            RiskClassification::Low,
            "approve".to_string(),
            Some(1.2),
        )
    } else if score <= 50 {
        (
            RiskClassification::Medium,
            "approve with added collateral".to_string(),
            Some(1.8),
        )
    } else if score <= 75 {
        (
            RiskClassification::High,
            "requires committee review".to_string(),
            Some(2.5),
        )
    } else {
        (
            RiskClassification::VeryHigh,
            "do not approve".to_string(),
            None,
        )
    };

    RiskAssessment {
        risk_score: score,
        classification,
        recommendation,
        suggested_monthly_rate,
        factors,
    }
}

/// SHA256 fingerprint of the canonical input JSON, for audit references.
/// Uses zero-copy streaming serialization into the hasher.
pub fn input_fingerprint(input: &RiskAssessmentInput) -> String {
    let mut hasher = Sha256::new();

    if serde_json::to_writer(&mut HashWriter(&mut hasher), input).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
