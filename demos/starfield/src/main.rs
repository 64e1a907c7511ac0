// Native development window. The browser build starts from the library's
// wasm entry point instead.
#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    starfield_ngin::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {}
