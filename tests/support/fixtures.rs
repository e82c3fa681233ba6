//! Definition files and input data shared by the integration tests.

/// Two raw prices, a scaled tax and an expression over both.
pub const PRICES: &str = r#"
price:
  description: Net price
  data_type: float64
  group: raw
tax:
  description: Tax amount
  data_type: float64
  group: raw
  transformation:
    halve:
      _target_: scale
      factor: 0.5
gross:
  description: Price plus twice the tax
  data_type: float64
  group: derived
  dependencies: [price, tax]
  transformation:
    combine:
      _target_: 0.5*(price + tax*2)
"#;

pub const PRICES_DATA: &str = r#"{"price": [10.0, 20.0], "tax": [40.0, 80.0]}"#;

/// A feature reading an intermediate step of another one.
pub const STAGES: &str = r#"
reading:
  description: Sensor reading
  data_type: float64
  transformation:
    doubled:
      _target_: scale
      factor: 2.0
    rooted:
      _target_: sqrt
offset:
  description: Doubled reading minus one
  data_type: float64
  dependencies: [reading]
  transformation:
    back:
      _target_: reading:doubled - 1
"#;

/// Two features that depend on each other.
pub const CYCLE: &str = r#"
a:
  description: First of a loop
  data_type: int64
  dependencies: [b]
  transformation:
    t:
      _target_: b + 1
b:
  description: Second of a loop
  data_type: int64
  dependencies: [a]
  transformation:
    t:
      _target_: a + 1
"#;
