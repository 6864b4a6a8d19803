//! Built-ins mandated by the core (spec §6.3) plus the optional
//! Lambda-origin demonstrations (spec §4.1 / `SPEC_FULL.md` §D): `print`,
//! `force`, `_G`, and `math.{sin,cos,tan,sqrt}`. Modeled on the teacher's
//! `stdlib/basic.rs` / `stdlib/math.rs` split
//! (`examples/CppCXY-lua-rs/crates/luars/src/stdlib/mod.rs`), minus every
//! module the teacher carries that this spec names as an explicit Non-goal
//! (`string`, `table`, `os`, `io`, `coroutine`, `utf8`, `package`, `debug`).

pub mod basic;
pub mod math;

use crate::env::Environment;

/// Installs every core-mandated and supplemented built-in into `env`'s
/// global scope (spec §6.3).
pub fn install(env: &Environment) {
    basic::install(env);
    math::install(env);
}
