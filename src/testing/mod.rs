//! Shared fixtures for unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::sync::Mutex;

use crate::auth::{hash_password, Identity};
use crate::clock::Clock;
use crate::database::MemoryStore;

pub const FIXTURE_PASSWORD: &str = "s3nha-forte";

static FIXTURE_HASH: Lazy<String> =
    Lazy::new(|| hash_password(FIXTURE_PASSWORD).expect("fixture hash"));

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).single().expect("valid start time");
        Self { now: Mutex::new(start) }
    }
}

impl ManualClock {
    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now = *now + Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn identity(nome: &str, tipo_acesso: &str) -> Identity {
    Identity { nome: nome.to_string(), tipo_acesso: tipo_acesso.to_string() }
}

fn user(nome: &str, tipo_acesso: &str) -> Value {
    json!({ "nome": nome, "tipo_acesso": tipo_acesso, "senha": FIXTURE_HASH.as_str() })
}

/// Users `ana` (SP01), `bia` (RJ02) and `root` (ALL), all with `FIXTURE_PASSWORD`,
/// plus a few rows in branch-scoped and global tables.
pub fn fixture_store() -> MemoryStore {
    MemoryStore::new()
        .with_table("acessos", vec![user("ana", "SP01"), user("bia", "RJ02"), user("root", "ALL")])
        .with_table(
            "filiais",
            vec![
                json!({ "nome": "SP01", "descricao": "Sao Paulo", "ativo": true }),
                json!({ "nome": "RJ02", "descricao": "Rio de Janeiro", "ativo": true }),
                json!({ "nome": "BH03", "descricao": "Belo Horizonte", "ativo": false }),
            ],
        )
        .with_table(
            "lojas",
            vec![
                json!({ "nome": "Centro", "filial": "SP01", "area": 120 }),
                json!({ "nome": "Barra", "filial": "RJ02", "area": 80 }),
                json!({ "nome": "Paulista", "filial": "SP01", "area": 95 }),
            ],
        )
        .with_table("docas", vec![])
        .with_table(
            "gps_tracking",
            vec![
                json!({ "veiculo": "ABC1234", "filial": "SP01" }),
                json!({ "veiculo": "XYZ9876", "filial": "RJ02" }),
            ],
        )
}
