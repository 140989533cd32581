//! Built-in glossary behind the reader's "define" lookup, indexed with FTS5.

use anyhow::Context as _;
use rusqlite::Connection;

const ENTRIES: &[(&str, &str)] = &[
    (
        "Bank",
        "An institution for receiving, lending, exchanging, and safeguarding money.",
    ),
    (
        "Bank",
        "The land beside a body of water, such as a river.",
    ),
    (
        "Trace-based",
        "A method of optimization that uses execution traces to identify hot code paths.",
    ),
    (
        "Just-in-Time",
        "A method of executing computer code that involves compilation during execution rather than prior to execution.",
    ),
    (
        "Specialization",
        "The process of tailoring code for specific types or values to improve performance.",
    ),
    (
        "Dynamic",
        "Characterized by constant change, activity, or progress; in computing, referring to processes that occur during execution.",
    ),
    (
        "Compiler",
        "A program that translates source code into machine code or bytecode.",
    ),
    (
        "Interpreter",
        "A program that executes instructions directly without prior compilation.",
    ),
    (
        "Heuristic",
        "A technique designed for solving a problem more quickly when classic methods are too slow.",
    ),
    (
        "Deterministic",
        "A process that, given a particular input, will always produce the same output.",
    ),
    (
        "Optimization",
        "The action of making the best or most effective use of a resource.",
    ),
    (
        "Virtual Machine",
        "An emulation of a computer system providing the functionality of a physical computer.",
    ),
    (
        "Bytecode",
        "A form of instruction set designed for efficient execution by a software interpreter.",
    ),
    (
        "Type",
        "A category for a piece of data that determines what operations can be performed on it.",
    ),
    (
        "Pointer",
        "A variable that stores the memory address of another value.",
    ),
    (
        "Allocation",
        "The process of reserving a block of memory for data.",
    ),
    (
        "Garbage Collection",
        "Automatic memory management that reclaims space used by objects no longer in use.",
    ),
    (
        "Latency",
        "The time interval between a cause and its effect in a system.",
    ),
    (
        "Throughput",
        "The amount of data or processes handled within a specific period.",
    ),
];

#[derive(Debug)]
pub struct Dictionary {
    conn: Connection,
}

impl Dictionary {
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open dictionary db")?;
        conn.execute_batch("CREATE VIRTUAL TABLE dictionary USING fts5(word, definition);")
            .context("create dictionary index")?;
        {
            let mut insert =
                conn.prepare("INSERT INTO dictionary (word, definition) VALUES (?, ?)")?;
            for (word, definition) in ENTRIES {
                insert
                    .execute((word, definition))
                    .with_context(|| format!("seed dictionary entry {word}"))?;
            }
        }
        Ok(Self { conn })
    }

    /// Definitions whose headword contains `term` as a phrase. Matching is
    /// case-insensitive and ignores punctuation in the query.
    pub fn lookup(&self, term: &str) -> anyhow::Result<Vec<String>> {
        let Some(query) = phrase_query(term) else {
            return Ok(Vec::new());
        };
        let mut stmt = self
            .conn
            .prepare("SELECT definition FROM dictionary WHERE word MATCH ? ORDER BY rowid")?;
        let rows = stmt.query_map([query], |row| row.get(0))?;
        let definitions = rows
            .collect::<Result<Vec<String>, _>>()
            .with_context(|| format!("look up {term:?}"))?;
        Ok(definitions)
    }
}

/// Builds an FTS5 phrase restricted to alphanumeric tokens, so user input can
/// never be parsed as query syntax.
fn phrase_query(term: &str) -> Option<String> {
    let tokens: Vec<&str> = term
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect();
    if tokens.is_empty() {
        return None;
    }
    Some(format!("\"{}\"", tokens.join(" ")))
}
