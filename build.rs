/// Build script for minigl
///
/// # Shader Strategy:
/// - GLSL sources are read and split into stages at runtime (`#type` / `#ifdef` markers)
/// - Demo assets live in demos/res and are not embedded, only tracked for rebuilds
fn main() {
    // Trigger rebuild if demo shader files change
    println!("cargo:rerun-if-changed=demos/res");
}
