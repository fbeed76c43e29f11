//! Static registry of built-in renderers (§9: "the renderer set is closed at
//! build time ... registers itself into a static table at startup").

mod plasma;
mod ripple;
mod sparkle;

use crate::renderer::Renderer;

pub use plasma::PlasmaRenderer;
pub use ripple::RippleRenderer;
pub use sparkle::SparkleRenderer;

pub type RendererFactory = fn() -> Box<dyn Renderer>;

pub const BUILTIN_RENDERERS: &[(&str, RendererFactory)] = &[
    ("plasma", || Box::new(PlasmaRenderer::new())),
    ("ripple", || Box::new(RippleRenderer::new())),
    ("sparkle", || Box::new(SparkleRenderer::new())),
];

pub fn by_name(name: &str) -> Option<Box<dyn Renderer>> {
    BUILTIN_RENDERERS.iter().find(|(n, _)| *n == name).map(|(_, factory)| factory())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plasma_and_ripple_are_registered() {
        assert!(by_name("plasma").is_some());
        assert!(by_name("ripple").is_some());
        assert!(by_name("sparkle").is_some());
    }

    #[test]
    fn unknown_name_is_not_registered() {
        assert!(by_name("rainbow-swirl-v2").is_none());
    }
}
