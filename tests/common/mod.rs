#![allow(dead_code)]

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use filial_gateway::app::{app, AppState};
use filial_gateway::auth::hash_password;
use filial_gateway::clock::SystemClock;
use filial_gateway::config::AppConfig;
use filial_gateway::database::MemoryStore;

pub const PASSWORD: &str = "s3nha-forte";
pub const ALLOWED_ORIGIN: &str = "http://localhost:3000";

static PASSWORD_HASH: OnceLock<String> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    /// Logs in through `/api/auth/login` and returns the session token.
    pub async fn login(&self, user: &str, filial: Option<&str>) -> Result<String> {
        let mut body = json!({ "user": user, "password": PASSWORD });
        if let Some(filial) = filial {
            body["filial"] = json!(filial);
        }
        let res = self.client.post(self.url("/api/auth/login")).json(&body).send().await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
        let body: Value = res.json().await?;
        body["token"].as_str().map(String::from).context("login response has no token")
    }
}

fn user(nome: &str, tipo_acesso: &str) -> Value {
    let hash = PASSWORD_HASH.get_or_init(|| hash_password(PASSWORD).expect("fixture hash"));
    json!({ "nome": nome, "tipo_acesso": tipo_acesso, "senha": hash })
}

/// Users `ana` (SP01), `bia` (RJ02) and `root` (ALL), all with `PASSWORD`.
fn seeded_store() -> MemoryStore {
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
                json!({ "nome": "Centro", "filial": "SP01", "area": 120, "codigo": "L1" }),
                json!({ "nome": "Barra", "filial": "RJ02", "area": 80, "codigo": "L2" }),
                json!({ "nome": "Paulista", "filial": "SP01", "area": 95, "codigo": "L3" }),
                json!({ "nome": "Moema", "filial": "SP01", "area": 60, "codigo": "L4" }),
                json!({ "nome": "Leblon", "filial": "RJ02", "area": 150, "codigo": "L5" }),
            ],
        )
        .with_table("docas", vec![])
        .with_table(
            "veiculos",
            vec![
                json!({ "placa": "ABC1234", "filial": "SP01", "status": "livre" }),
                json!({ "placa": "XYZ9876", "filial": "RJ02", "status": "livre" }),
            ],
        )
        .with_table(
            "gps_tracking",
            vec![
                json!({ "placa": "ABC1234", "filial": "SP01", "lat": -23.5 }),
                json!({ "placa": "XYZ9876", "filial": "RJ02", "lat": -22.9 }),
            ],
        )
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = "integration-secret".to_string();
    config.security.cors_origins = vec![ALLOWED_ORIGIN.to_string()];
    config.filter.max_limit = Some(2);
    config
}

/// Starts the router on a free port against a freshly seeded in-memory store.
pub async fn spawn_server() -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);

    let config = test_config();
    let state = AppState::new(Arc::new(seeded_store()), Arc::new(SystemClock), &config)?;
    let router = app(state, &config);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind {}", base_url))?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    let server = TestServer { port, base_url, client: reqwest::Client::new() };
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
