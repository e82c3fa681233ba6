//! Pure graph logic over feature definitions.
//!
//! Nothing here touches the filesystem or runs transformations, so the
//! ordering rules can be tested on plain specs.

pub mod dependency;
