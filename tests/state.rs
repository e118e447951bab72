extern crate crayon_renderstate;
extern crate env_logger;
extern crate rand;

use rand::Rng;

use crayon_renderstate::prelude::*;

fn testbed() -> (RenderStateCache, HeadlessVisitor, HeadlessLog) {
    let _ = env_logger::try_init();

    let visitor = HeadlessVisitor::new();
    let log = visitor.log();
    let mut state = RenderStateCache::new(&RenderSettings::default());
    state.validate();
    (state, visitor, log)
}

#[test]
fn idempotent() {
    let (mut state, mut visitor, log) = testbed();
    let n = rand::thread_rng().gen_range(2, 64);

    for _ in 0..n {
        state.enable_depth_testing(&mut visitor, true);
        state.enable_depth_writing(&mut visitor, false);
        state.enable_alpha_blending(&mut visitor, true);
        state.set_cull_face(&mut visitor, CullFace::Front);
        state.set_depth_function(&mut visitor, DepthFunction::Less);
        state.set_blend_function(&mut visitor, BlendMode::One, BlendMode::One);
        state.set_clear_colour(&mut visitor, Color::red());
    }

    assert_eq!(log.count(|v| *v == Call::Capability(Capability::DepthTest, true)), 1);
    assert_eq!(log.count(|v| *v == Call::DepthMask(false)), 1);
    assert_eq!(log.count(|v| *v == Call::Capability(Capability::Blend, true)), 1);
    assert_eq!(log.count(|v| *v == Call::CullFace(CullFace::Front)), 1);
    assert_eq!(log.count(|v| *v == Call::DepthFunction(DepthFunction::Less)), 1);
    assert_eq!(
        log.count(|v| *v == Call::BlendFunction(BlendMode::One, BlendMode::One)),
        1
    );
    assert_eq!(log.count(|v| *v == Call::ClearColour(Color::red())), 1);
    assert_eq!(log.calls().len(), 7);
    assert_eq!(state.changes(), 7);
}

#[test]
fn unchanged_values_are_not_sent() {
    let (mut state, mut visitor, log) = testbed();

    // Matches the defaults.
    state.enable_depth_writing(&mut visitor, true);
    state.enable_colour_writing(&mut visitor, true);
    state.enable_face_culling(&mut visitor, false);
    state.set_depth_function(&mut visitor, DepthFunction::LessEqual);
    state.set_blend_function(
        &mut visitor,
        BlendMode::SourceAlpha,
        BlendMode::OneMinusSourceAlpha,
    );

    assert!(log.calls().is_empty());
}

#[test]
fn invalidation() {
    let (mut state, mut visitor, log) = testbed();
    state.set_cull_face(&mut visitor, CullFace::Front);
    state.enable_face_culling(&mut visitor, true);

    state.force_refresh_all(&mut visitor);
    assert!(state.is_invalidated());

    // The defaults are re-established right away.
    assert_eq!(
        log.count(|v| *v
            == Call::BlendFunction(BlendMode::SourceAlpha, BlendMode::OneMinusSourceAlpha)),
        1
    );
    assert_eq!(
        log.count(|v| *v == Call::DepthFunction(DepthFunction::LessEqual)),
        1
    );

    log.clear();
    state.set_cull_face(&mut visitor, CullFace::Front);
    state.enable_face_culling(&mut visitor, true);
    state.set_scissor_region(&mut visitor, Vector2::new(0, 0), Vector2::new(0, 0));

    assert_eq!(
        log.calls(),
        vec![
            Call::CullFace(CullFace::Front),
            Call::Capability(Capability::CullFace, true),
            Call::Scissor(Vector2::new(0, 0), Vector2::new(0, 0)),
        ]
    );

    state.validate();
    log.clear();
    state.set_cull_face(&mut visitor, CullFace::Front);
    assert!(log.calls().is_empty());
}

#[test]
fn lock_suppression() {
    let (mut state, mut visitor, log) = testbed();

    state.lock_depth_writing();
    state.enable_depth_writing(&mut visitor, false);
    state.enable_depth_writing(&mut visitor, false);
    assert!(state.is_depth_writing_enabled());
    assert!(log.calls().is_empty());

    // Invalidation re-sends the locked value, not the requested one.
    state.force_refresh_all(&mut visitor);
    log.clear();
    state.enable_depth_writing(&mut visitor, false);
    assert_eq!(log.calls(), vec![Call::DepthMask(true)]);
    assert!(state.is_depth_writing_enabled());

    state.unlock_depth_writing();
    state.validate();
    log.clear();
    state.enable_depth_writing(&mut visitor, false);
    assert_eq!(log.calls(), vec![Call::DepthMask(false)]);
    assert!(!state.is_depth_writing_enabled());
}

#[test]
fn alpha_blending_lock() {
    let (mut state, mut visitor, log) = testbed();

    state.enable_alpha_blending(&mut visitor, true);
    state.lock_alpha_blending();
    state.enable_alpha_blending(&mut visitor, false);
    assert!(state.is_alpha_blending_enabled());
    assert_eq!(log.count(|v| *v == Call::Capability(Capability::Blend, false)), 0);

    state.unlock_alpha_blending();
    state.enable_alpha_blending(&mut visitor, false);
    assert_eq!(log.count(|v| *v == Call::Capability(Capability::Blend, false)), 1);
}

#[test]
fn blend_function_lock_drops_calls() {
    let (mut state, mut visitor, log) = testbed();

    state.set_blend_function(&mut visitor, BlendMode::One, BlendMode::Zero);
    state.lock_blend_function();
    state.set_blend_function(&mut visitor, BlendMode::One, BlendMode::One);
    assert_eq!(state.blend_function(), (BlendMode::One, BlendMode::Zero));

    log.clear();
    state.force_refresh_all(&mut visitor);
    state.set_blend_function(&mut visitor, BlendMode::One, BlendMode::One);

    // Not even the default is re-established while locked.
    assert_eq!(
        log.count(|v| match v {
            Call::BlendFunction(_, _) => true,
            _ => false,
        }),
        0
    );
    assert_eq!(
        log.count(|v| *v == Call::DepthFunction(DepthFunction::LessEqual)),
        1
    );

    state.unlock_blend_function();
    state.set_blend_function(&mut visitor, BlendMode::One, BlendMode::One);
    assert_eq!(
        log.count(|v| *v == Call::BlendFunction(BlendMode::One, BlendMode::One)),
        1
    );
}

#[test]
fn scissor_region() {
    let (mut state, mut visitor, log) = testbed();

    state.set_scissor_region(&mut visitor, Vector2::new(10, 10), Vector2::new(50, 50));
    state.set_scissor_region(&mut visitor, Vector2::new(10, 10), Vector2::new(50, 50));
    assert_eq!(log.calls().len(), 1);

    state.set_scissor_region(&mut visitor, Vector2::new(10, 10), Vector2::new(60, 50));
    assert_eq!(
        log.calls(),
        vec![
            Call::Scissor(Vector2::new(10, 10), Vector2::new(50, 50)),
            Call::Scissor(Vector2::new(10, 10), Vector2::new(60, 50)),
        ]
    );
}

#[test]
fn texture_units() {
    let (mut state, mut visitor, log) = testbed();

    state.bind_texture(&mut visitor, 0, TextureTarget::Texture2D, 3);
    state.bind_texture(&mut visitor, 0, TextureTarget::Texture2D, 3);
    state.bind_texture(&mut visitor, 1, TextureTarget::CubeMap, 4);
    state.bind_texture(&mut visitor, 1, TextureTarget::Texture2D, 3);

    assert_eq!(
        log.calls(),
        vec![
            Call::ActiveTexture(0),
            Call::BindTexture(TextureTarget::Texture2D, 3),
            Call::ActiveTexture(1),
            Call::BindTexture(TextureTarget::CubeMap, 4),
            Call::BindTexture(TextureTarget::Texture2D, 3),
        ]
    );

    // A deleted texture name may be recycled by the driver.
    state.forget_texture(3);
    log.clear();
    state.bind_texture(&mut visitor, 0, TextureTarget::Texture2D, 3);
    assert_eq!(
        log.calls(),
        vec![
            Call::ActiveTexture(0),
            Call::BindTexture(TextureTarget::Texture2D, 3),
        ]
    );

    state.force_refresh_all(&mut visitor);
    log.clear();
    state.bind_texture(&mut visitor, 0, TextureTarget::Texture2D, 3);
    assert_eq!(log.calls().len(), 2);
}
