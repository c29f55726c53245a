//! Fixed test IDs for deterministic tests

use common::types::{OrgId, SessionId, UserId};
use uuid::Uuid;

// User IDs (100-199)
pub const TEST_USER_ALICE: UserId = UserId(Uuid::from_u128(100));
pub const TEST_USER_BOB: UserId = UserId(Uuid::from_u128(101));

// Organization IDs (1000-1099)
pub const TEST_ORG_ACME: OrgId = OrgId(Uuid::from_u128(1000));
pub const TEST_ORG_GLOBEX: OrgId = OrgId(Uuid::from_u128(1001));

// Session IDs (2000-2099)
pub const TEST_SESSION_1: SessionId = SessionId(Uuid::from_u128(2000));
pub const TEST_SESSION_2: SessionId = SessionId(Uuid::from_u128(2001));

// Registration inputs
pub const TEST_ORG_NAME: &str = "Acme";
pub const TEST_EMAIL: &str = "a@acme.com";
pub const TEST_PASSWORD: &str = "pw123";
