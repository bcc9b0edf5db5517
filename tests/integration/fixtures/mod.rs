// Mined log fixtures with known extraction outputs
// WHY: Golden-file testing requires deterministic input/output pairs for validation

/// (content, event id, template) rows as a Drain run over sshd logs would label them
pub const SSHD_ROWS: &[(&str, &str, &str)] = &[
    (
        "Accepted password for alice from host-7 port 52144 ssh2",
        "a1b2c3d4",
        "Accepted password for <*> from <*> port <*> ssh2",
    ),
    (
        "Connection closed by gateway port 22",
        "e5f60718",
        "Connection closed by <*> port <*>",
    ),
    (
        "Accepted password for bob from host-9 port 40022 ssh2",
        "a1b2c3d4",
        "Accepted password for <*> from <*> port <*> ssh2",
    ),
    ("Server listening on 0 0 0 0", "0f0f0f0f", "Server listening on 0 0 0 0"),
];

/// Extraction report for SSHD_ROWS; the marker-free template keeps its trailing ", "
pub const SSHD_EXPECTED: &str = "TemplateID: a1b2c3d4, <*> : alice, <*> : host-7, <*> : 52144
TemplateID: e5f60718, <*> : gateway, <*> : 22
TemplateID: a1b2c3d4, <*> : bob, <*> : host-9, <*> : 40022
TemplateID: 0f0f0f0f, ";

/// A multi-token value is cut at its first space, shifting every later span
pub const DRIFT_TEMPLATE: &str = "Accepted password for <*> from <*> port <*> ssh2";
pub const DRIFT_LINE: &str = "Accepted password for alice from 10 0 0 7 port 52144 ssh2";
pub const DRIFT_EXPECTED: &str = "<*> : alice, <*> : 10, <*> : ";

/// Raw shard contents before separator normalization
pub const SHARD_ONE: &str = "GET /index.html (200)\nGET /api/v1 [404]\n";
pub const SHARD_TWO: &str = "worker.3 started\n";

/// Corpus produced from SHARD_ONE followed by SHARD_TWO
pub const CORPUS_EXPECTED: &str = "GET  index html  200 \nGET  api v1  404 \nworker 3 started\n";
