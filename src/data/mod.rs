/// Data layer: core types, record parsing and project persistence.
///
/// Architecture:
/// ```text
///  .opro / .json project        tab-separated trace dump
///        │                               │
///        ▼                               ▼
///   ┌──────────┐                   ┌──────────┐
///   │ project   │  files → records │  loader   │  records → RawTrace
///   └──────────┘                   └──────────┘
///        │                               │
///        └──────────────┬────────────────┘
///                       ▼
///                ┌────────────┐
///                │   model     │  RawTrace, NormalizedTrace, Event, ...
///                └────────────┘
/// ```

pub mod loader;
pub mod model;
pub mod project;
