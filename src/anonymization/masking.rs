//! Masking service: produces a replacement value for one field
//!
//! [`FakerMaskingService`] is the default implementation. Text strategies draw
//! realistic values from the `fake` crate; numeric, date and boolean values
//! are drawn from the service's RNG.

use super::redaction::redact;
use super::strategy::MaskingStrategy;
use super::tokenization::TokenCounters;
use crate::core::accessor::FieldDescriptor;
use crate::domain::{CustodianError, FieldKind, FieldValue, Result};
use chrono::{Duration, NaiveDate};
use fake::faker::address::en::{CityName, StreetName};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use std::sync::Mutex;

/// Draws attempted before accepting a replacement equal to the original
const MAX_ATTEMPTS: usize = 5;

/// Computes anonymized replacement values
pub trait MaskingService: Send + Sync {
    /// Replacement for `current`, following `strategy` or the kind default
    ///
    /// # Errors
    ///
    /// Returns [`CustodianError::Domain`] for an unknown strategy id or one
    /// that cannot produce a value of the field's kind.
    fn anonymize_value(
        &self,
        current: &FieldValue,
        field: &FieldDescriptor,
        strategy: Option<&str>,
    ) -> Result<FieldValue>;
}

/// Resolves the strategy for a field, validating applicability
pub fn resolve_strategy(field: &FieldDescriptor, strategy: Option<&str>) -> Result<MaskingStrategy> {
    let resolved = match strategy {
        Some(id) => id.parse::<MaskingStrategy>().map_err(CustodianError::Domain)?,
        None => MaskingStrategy::default_for(field.kind),
    };
    if !resolved.applies_to(field.kind) {
        return Err(CustodianError::Domain(format!(
            "Masking strategy '{}' cannot produce a {} value for field '{}'",
            resolved, field.kind, field.name
        )));
    }
    Ok(resolved)
}

struct MaskingState {
    rng: StdRng,
    tokens: TokenCounters,
    salt: [u8; 16],
}

/// `fake`-backed masking service
pub struct FakerMaskingService {
    state: Mutex<MaskingState>,
}

impl FakerMaskingService {
    /// Service seeded from OS entropy
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Reproducible service for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    /// Seeded when `seed` is set, entropy otherwise
    pub fn with_optional_seed(seed: Option<u64>) -> Self {
        seed.map(Self::seeded).unwrap_or_default()
    }

    fn from_rng(mut rng: StdRng) -> Self {
        let salt = rng.gen();
        Self {
            state: Mutex::new(MaskingState {
                rng,
                tokens: TokenCounters::new(),
                salt,
            }),
        }
    }
}

impl Default for FakerMaskingService {
    fn default() -> Self {
        Self::new()
    }
}

impl MaskingService for FakerMaskingService {
    fn anonymize_value(
        &self,
        current: &FieldValue,
        field: &FieldDescriptor,
        strategy: Option<&str>,
    ) -> Result<FieldValue> {
        let strategy = resolve_strategy(field, strategy)?;
        let mut state = self
            .state
            .lock()
            .map_err(|_| CustodianError::Other("Masking service state poisoned".to_string()))?;

        let mut candidate = state.generate(strategy, current, field);
        for _ in 1..MAX_ATTEMPTS {
            if &candidate != current {
                break;
            }
            candidate = state.generate(strategy, current, field);
        }
        Ok(candidate)
    }
}

impl MaskingState {
    fn generate(
        &mut self,
        strategy: MaskingStrategy,
        current: &FieldValue,
        field: &FieldDescriptor,
    ) -> FieldValue {
        let rng = &mut self.rng;
        match strategy {
            MaskingStrategy::FakeName => FieldValue::Text(Name().fake_with_rng(rng)),
            MaskingStrategy::FakeFirstName => FieldValue::Text(FirstName().fake_with_rng(rng)),
            MaskingStrategy::FakeLastName => FieldValue::Text(LastName().fake_with_rng(rng)),
            MaskingStrategy::FakeEmail => FieldValue::Text(SafeEmail().fake_with_rng(rng)),
            MaskingStrategy::FakePhone => FieldValue::Text(PhoneNumber().fake_with_rng(rng)),
            MaskingStrategy::FakeStreet => {
                let number: u16 = rng.gen_range(1..500);
                let street: String = StreetName().fake_with_rng(rng);
                FieldValue::Text(format!("{number} {street}"))
            }
            MaskingStrategy::FakeCity => FieldValue::Text(CityName().fake_with_rng(rng)),
            MaskingStrategy::FakeCompany => FieldValue::Text(CompanyName().fake_with_rng(rng)),
            MaskingStrategy::FakeText => FieldValue::Text(Sentence(3..8).fake_with_rng(rng)),
            MaskingStrategy::Redact => FieldValue::Text(redact(&field.name)),
            MaskingStrategy::Token => FieldValue::Text(self.tokens.next_token(&field.name, rng)),
            MaskingStrategy::Hash => {
                let mut hasher = Sha256::new();
                hasher.update(self.salt);
                hasher.update(current.to_string().as_bytes());
                let digest = format!("{:x}", hasher.finalize());
                FieldValue::Text(digest[..16].to_string())
            }
            MaskingStrategy::RandomNumber => match field.kind {
                FieldKind::Integer => FieldValue::Integer(rng.gen_range(0..1_000_000)),
                FieldKind::Decimal => {
                    FieldValue::Decimal(rng.gen_range(0..10_000_000) as f64 / 100.0)
                }
                _ => FieldValue::Text(format!("{:08}", rng.gen_range(0..100_000_000u32))),
            },
            MaskingStrategy::RandomDate => {
                let date = random_date(rng);
                match field.kind {
                    FieldKind::DateTime => {
                        let seconds = rng.gen_range(0..86_400);
                        FieldValue::DateTime(
                            date.and_time(chrono::NaiveTime::MIN) + Duration::seconds(seconds),
                        )
                    }
                    _ => FieldValue::Date(date),
                }
            }
            MaskingStrategy::RandomBool => FieldValue::Boolean(rng.gen()),
        }
    }
}

/// Uniform date between 1950-01-01 and 2000-12-31
fn random_date<R: Rng + ?Sized>(rng: &mut R) -> NaiveDate {
    let start = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap_or(NaiveDate::MIN);
    start + Duration::days(rng.gen_range(0..18_628))
}
