// fn main not required
mod health_check;
mod helpers;
mod lifecycle;
mod sdes_callback;

// 'no external crate' -- add to Cargo.toml:
// [lib]
// path = "src/lib.rs"

// black-box tests are most robust, as they reflect exactly how clients interact
// with the API (request type, path, status code)
//
// integration tests are built in target/debug/deps (one per tests/*.rs file or
// tests/* directory; usually with multiple builds)
//
// an added benefit of grouping tests in a single dir: "While each executable is
// compiled in parallel, the linking phase is instead entirely sequential!
// Bundling all your test cases in a single executable reduces the time spent
// compiling your test suite in CI."
