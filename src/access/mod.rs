//! Branch authorization and the table allow-list.

use crate::filter::Clause;

/// Access scope that grants every branch.
pub const ALL_BRANCHES: &str = "ALL";

/// Column that partitions branch-scoped tables.
pub const BRANCH_FIELD: &str = "filial";

const ALLOWED_TABLES: &[&str] = &[
    "expeditions",
    "expedition_items",
    "lojas",
    "docas",
    "veiculos",
    "motoristas",
    "lideres",
    "filiais",
    "acessos",
    "pontos_interesse",
    "gps_tracking",
    "veiculos_status_historico",
];

const STANDARD_GLOBAL_TABLES: &[&str] = &["filiais", "acessos"];

const EXTENDED_GLOBAL_TABLES: &[&str] =
    &["filiais", "acessos", "gps_tracking", "veiculos_status_historico"];

/// Access scope attached to an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    All,
    Branch(String),
}

impl AccessScope {
    pub fn parse(raw: &str) -> Self {
        if raw == ALL_BRANCHES {
            AccessScope::All
        } else {
            AccessScope::Branch(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AccessScope::All => ALL_BRANCHES,
            AccessScope::Branch(branch) => branch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Denied,
}

impl AccessDecision {
    pub fn is_allowed(self) -> bool {
        self == AccessDecision::Allowed
    }
}

/// Allowed iff the scope is `ALL` or names exactly the requested branch.
pub fn authorize(scope: &AccessScope, requested_branch: &str) -> AccessDecision {
    match scope {
        AccessScope::All => AccessDecision::Allowed,
        AccessScope::Branch(branch) if branch == requested_branch => AccessDecision::Allowed,
        AccessScope::Branch(_) => AccessDecision::Denied,
    }
}

/// Static allow-list partitioned into branch-scoped and global tables.
#[derive(Debug, Clone, Copy)]
pub struct TableRegistry {
    allowed: &'static [&'static str],
    global: &'static [&'static str],
}

impl TableRegistry {
    /// Used by the header-credential proxy.
    pub fn standard() -> Self {
        Self { allowed: ALLOWED_TABLES, global: STANDARD_GLOBAL_TABLES }
    }

    /// Used by the session-token proxy: tracking history is shared across branches.
    pub fn extended() -> Self {
        Self { allowed: ALLOWED_TABLES, global: EXTENDED_GLOBAL_TABLES }
    }

    pub fn is_table_allowed(&self, table: &str) -> bool {
        self.allowed.contains(&table)
    }

    pub fn is_global(&self, table: &str) -> bool {
        self.global.contains(&table)
    }

    /// The mandatory `filial = <branch>` clause, or `None` for global tables.
    pub fn scope_table(&self, table: &str, branch: &str) -> Option<Clause> {
        if self.is_global(table) {
            None
        } else {
            Some(Clause::equals(BRANCH_FIELD, branch))
        }
    }
}
