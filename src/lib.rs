//! # Todo Agent
//!
//! A todo list service with AI assistance.
//!
//! Tasks are stored in SQLite (or in memory), categorized on creation, and
//! exposed through an HTTP API and the `todo` CLI. The assistant summarizes
//! the task list and answers questions about it, optionally pulling in tasks
//! similar to a selected snippet of text through an embedding index.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌─────────────┐
//! │   HTTP   │──▶│  Todos   │──▶│   SQLite    │
//! │   CLI    │   │ +Categor.│   │ / in-memory │
//! └────┬─────┘   └──────────┘   └─────────────┘
//!      │
//!      ▼
//! ┌──────────┐   ┌──────────┐   ┌─────────────┐
//! │Assistant │──▶│ Context  │──▶│TextGenerator│
//! │          │──▶│  Index   │──▶│  Embedder   │
//! └──────────┘   └──────────┘   └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! todo init                          # create database
//! todo add "Urgent: finish report"   # categorized as Urgent
//! todo list
//! todo summary
//! todo chat "what should I do first?"
//! todo serve                         # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`store`] | Task storage and lifecycle rules |
//! | [`categorize`] | Keyword and AI categorizers |
//! | [`context`] | Prompt context assembly |
//! | [`llm`] | Text generation providers |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Similarity index and vector stores |
//! | [`service`] | Summary and chat |
//! | [`state`] | Application wiring |
//! | [`server`] | HTTP server |
//! | [`cli`] | CLI commands |

pub mod categorize;
pub mod cli;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod index;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod server;
pub mod service;
pub mod state;
pub mod store;
