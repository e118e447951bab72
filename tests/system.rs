extern crate crayon_renderstate;
extern crate env_logger;

use std::rc::Rc;

use crayon_renderstate::prelude::*;

fn setup(settings: RenderSettings) -> (RenderSystem, HeadlessLog) {
    let _ = env_logger::try_init();

    let visitor = HeadlessVisitor::new();
    let log = visitor.log();
    let video = RenderSystem::new(Box::new(visitor), settings).unwrap();
    (video, log)
}

fn settings() -> RenderSettings {
    let mut settings = RenderSettings::default();
    settings.context_loss = false;
    settings.check_errors = false;
    settings
}

fn material(joints: bool) -> Material {
    let mut shader = Shader::new(ShaderHandle::new(1, 1), 7)
        .with_attribute(Attribute::Position, 0)
        .with_attribute(Attribute::Texcoord0, 1)
        .with_uniform("u_wvpMat", 0)
        .with_uniform("u_cameraPos", 1)
        .with_uniform("u_worldMat", 4);

    if joints {
        shader = shader.with_uniform("u_joints", 9);
    }

    let mut material = Material::new(MaterialHandle::new(1, 1));
    material.set_shader(Rc::new(shader));
    material
}

fn quad(video: &mut RenderSystem, handle: MeshHandle, hint: MeshHint) {
    let mut params = MeshParams::default();
    params.hint = hint;
    params.layout = VertexLayout::build()
        .with(Attribute::Position, VertexFormat::Float, 3, false)
        .with(Attribute::Texcoord0, VertexFormat::Float, 2, false)
        .finish();
    params.num_verts = 4;
    params.num_idxes = 6;

    let data = MeshData {
        vptr: vec![0; 4 * 20],
        iptr: MeshData::indices(&[0, 1, 2, 0, 2, 3]),
    };

    video.create_mesh(handle, params, Some(data)).unwrap();
}

fn render_target(video: &mut RenderSystem, texture: TextureHandle, surface: SurfaceHandle) {
    let mut params = TextureParams::default();
    params.dimensions = Vector2::new(32, 32);
    video.create_texture(texture, params, None).unwrap();

    let params = SurfaceParams {
        colour: texture,
        depth: true,
    };

    video.create_surface(surface, params).unwrap();
}

#[test]
fn construction() {
    let (video, log) = setup(settings());

    assert_eq!(
        log.calls(),
        vec![
            Call::QueryMaxTextureUnits,
            Call::BlendFunction(BlendMode::SourceAlpha, BlendMode::OneMinusSourceAlpha),
            Call::DepthFunction(DepthFunction::LessEqual),
            Call::Viewport(Vector2::new(0, 0), Vector2::new(640, 480)),
        ]
    );

    assert!(video.state().is_invalidated());
    assert!(video.has_context());
    assert_eq!(video.max_texture_units(), 8);
    assert_eq!(video.dimensions(), Vector2::new(640, 480));
}

#[test]
fn no_texture_units() {
    let _ = env_logger::try_init();

    let visitor = HeadlessVisitor::with_limits(16, 0);
    match RenderSystem::new(Box::new(visitor), settings()) {
        Err(Error::Requirement(_)) => {}
        Err(err) => panic!("unexpected {}", err),
        Ok(_) => panic!("texture units are required"),
    }
}

#[test]
fn first_frame_establishes_everything() {
    let (mut video, log) = setup(settings());
    log.clear();

    assert!(video.begin_frame(None).unwrap());
    assert_eq!(
        log.calls(),
        vec![
            Call::BindFramebuffer(0),
            Call::Viewport(Vector2::new(0, 0), Vector2::new(640, 480)),
            Call::Capability(Capability::ScissorTest, false),
            Call::ColourMask(true),
            Call::DepthMask(true),
            Call::ClearColour(Color::black()),
            Call::Clear(true, true),
        ]
    );
}

#[test]
fn invalidation_ends_with_first_draw() {
    let (mut video, log) = setup(settings());
    let mesh = MeshHandle::new(1, 1);
    quad(&mut video, mesh, MeshHint::Immutable);

    let mut material = material(false);
    video.begin_frame(None).unwrap();
    video.apply_material(&mut material).unwrap();
    assert!(video.state().is_invalidated());

    video.render_vertex_buffer(mesh, Matrix4::identity()).unwrap();
    assert!(!video.state().is_invalidated());

    // Every slot is re-established while invalidated.
    assert_eq!(
        log.count(|v| match *v {
            Call::VertexAttribArray(_, _) => true,
            _ => false,
        }),
        16
    );

    video.end_frame(None).unwrap();

    log.clear();
    video.begin_frame(None).unwrap();
    assert_eq!(log.calls(), vec![Call::BindFramebuffer(0), Call::Clear(true, true)]);
}

#[test]
fn camera() {
    let (mut video, log) = setup(settings());
    let mesh = MeshHandle::new(1, 1);
    quad(&mut video, mesh, MeshHint::Immutable);

    let view = Matrix4::from_translation(Vector3::new(0.0, 0.0, -5.0));
    let world = Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0));
    let position = Vector3::new(0.0, 0.0, 5.0);

    video.apply_camera(position, view, Matrix4::identity(), Color::red());
    assert_eq!(video.view_matrix(), view);
    assert_eq!(video.projection_matrix(), Matrix4::identity());

    let mut material = material(false);
    video.begin_frame(None).unwrap();
    assert_eq!(log.count(|v| *v == Call::ClearColour(Color::red())), 1);

    video.apply_material(&mut material).unwrap();
    video.render_vertex_buffer(mesh, world).unwrap();

    let wvp = Matrix4::identity() * view * world;
    assert_eq!(
        log.count(|v| *v == Call::Uniform(0, UniformVariable::Matrix4f(wvp.into()))),
        1
    );
    assert_eq!(
        log.count(|v| *v == Call::Uniform(4, UniformVariable::Matrix4f(world.into()))),
        1
    );
    assert_eq!(
        log.count(|v| *v == Call::Uniform(1, UniformVariable::Vector3f([0.0, 0.0, 5.0]))),
        1
    );
}

#[test]
fn frame_info() {
    let (mut video, _) = setup(settings());
    let mesh = MeshHandle::new(1, 1);
    quad(&mut video, mesh, MeshHint::Immutable);

    let mut material = material(false);
    video.begin_frame(None).unwrap();
    video.apply_material(&mut material).unwrap();
    video.render_vertex_buffer(mesh, Matrix4::identity()).unwrap();
    video.render_buffer(mesh, 0, 3, Matrix4::identity()).unwrap();
    let info = video.end_frame(None).unwrap();

    assert_eq!(info.drawcalls, 2);
    assert_eq!(info.triangles, 3);
    assert!(info.state_changes > 0);

    video.begin_frame(None).unwrap();
    video.apply_material(&mut material).unwrap();
    video.render_vertex_buffer(mesh, Matrix4::identity()).unwrap();
    let info = video.end_frame(None).unwrap();

    assert_eq!(info.drawcalls, 1);
    assert_eq!(info.triangles, 2);
    assert_eq!(info.state_changes, 0);
}

#[test]
fn sub_ranges() {
    let (mut video, log) = setup(settings());
    let mesh = MeshHandle::new(1, 1);
    quad(&mut video, mesh, MeshHint::Immutable);

    let mut material = material(false);
    video.begin_frame(None).unwrap();
    video.apply_material(&mut material).unwrap();

    video.render_buffer(mesh, 3, 3, Matrix4::identity()).unwrap();
    assert_eq!(log.count(|v| *v == Call::DrawElements(MeshPrimitive::Triangles, 3, 3)), 1);

    match video.render_buffer(mesh, 4, 3, Matrix4::identity()) {
        Err(Error::OutOfBounds) => {}
        v => panic!("unexpected {:?}", v),
    }

    match video.render_vertex_buffer(MeshHandle::new(2, 1), Matrix4::identity()) {
        Err(Error::MeshHandleInvalid(_)) => {}
        v => panic!("unexpected {:?}", v),
    }
}

#[test]
fn draw_arrays() {
    let (mut video, log) = setup(settings());

    let mut params = MeshParams::default();
    params.layout = VertexLayout::build()
        .with(Attribute::Position, VertexFormat::Float, 3, false)
        .finish();
    params.num_verts = 3;
    params.primitive = MeshPrimitive::Points;

    let mesh = MeshHandle::new(1, 1);
    video.create_mesh(mesh, params, None).unwrap();

    let mut material = material(false);
    video.begin_frame(None).unwrap();
    video.apply_material(&mut material).unwrap();
    video.render_vertex_buffer(mesh, Matrix4::identity()).unwrap();

    assert_eq!(log.count(|v| *v == Call::DrawArrays(MeshPrimitive::Points, 0, 3)), 1);
    assert_eq!(video.end_frame(None).unwrap().triangles, 3);
}

#[test]
fn too_many_vertices() {
    let (mut video, log) = setup(settings());
    log.clear();

    let mut params = MeshParams::default();
    params.num_verts = 70_000;

    match video.create_mesh(MeshHandle::new(1, 1), params, None) {
        Err(Error::TooManyVertices(n)) => assert_eq!(n, 70_000),
        v => panic!("unexpected {:?}", v),
    }

    assert!(log.calls().is_empty());
}

#[test]
fn update_mesh() {
    let (mut video, log) = setup(settings());

    let (dynamic, immutable) = (MeshHandle::new(1, 1), MeshHandle::new(2, 1));
    quad(&mut video, dynamic, MeshHint::Dynamic);
    quad(&mut video, immutable, MeshHint::Immutable);

    video.update_mesh(dynamic, 4, &[1, 2, 3, 4]).unwrap();

    let vbo = log
        .calls()
        .into_iter()
        .find_map(|v| match v {
            Call::UpdateVertexBuffer(vbo, 4) => Some(vbo),
            _ => None,
        })
        .unwrap();

    assert_eq!(&log.buffer_bytes(vbo).unwrap()[4..8], &[1u8, 2, 3, 4][..]);

    match video.update_mesh(immutable, 0, &[1]) {
        Err(Error::Backend(_)) => {}
        v => panic!("unexpected {:?}", v),
    }

    match video.update_mesh(dynamic, 78, &[1, 2, 3]) {
        Err(Error::OutOfBounds) => {}
        v => panic!("unexpected {:?}", v),
    }
}

#[test]
fn surfaces() {
    let (mut video, log) = setup(settings());

    let texture = TextureHandle::new(1, 1);
    let surface = SurfaceHandle::new(1, 1);
    render_target(&mut video, texture, surface);

    let fbo = log
        .calls()
        .into_iter()
        .find_map(|v| match v {
            Call::CreateFramebuffer(fbo) => Some(fbo),
            _ => None,
        })
        .unwrap();

    log.clear();
    assert!(video.begin_frame(Some(surface)).unwrap());
    assert_eq!(log.calls()[0], Call::BindFramebuffer(fbo));
    assert_eq!(
        log.count(|v| *v == Call::Viewport(Vector2::new(0, 0), Vector2::new(32, 32))),
        1
    );

    log.clear();
    video.end_frame(Some(surface)).unwrap();
    assert_eq!(log.calls(), vec![Call::BindFramebuffer(0)]);

    video.delete_surface(surface).unwrap();
    assert_eq!(log.framebuffers(), 0);
    assert!(video.lifecycle().surfaces().is_empty());

    match video.begin_frame(Some(surface)) {
        Err(Error::SurfaceHandleInvalid(_)) => {}
        v => panic!("unexpected {:?}", v),
    }

    let params = SurfaceParams {
        colour: TextureHandle::new(5, 1),
        depth: false,
    };

    match video.create_surface(surface, params) {
        Err(Error::TextureHandleInvalid(_)) => {}
        v => panic!("unexpected {:?}", v),
    }
}

#[test]
fn delete_resources() {
    let (mut video, log) = setup(settings());

    let mesh = MeshHandle::new(1, 1);
    let texture = TextureHandle::new(1, 1);
    quad(&mut video, mesh, MeshHint::Immutable);

    let mut params = TextureParams::default();
    params.dimensions = Vector2::new(4, 4);
    video.create_texture(texture, params, None).unwrap();

    assert_eq!(log.buffers(), 2);
    assert_eq!(log.textures(), 1);

    video.delete_mesh(mesh).unwrap();
    video.delete_texture(texture).unwrap();

    assert_eq!(log.buffers(), 0);
    assert_eq!(log.textures(), 0);
    assert!(video.mesh(mesh).is_none());
    assert!(video.texture(texture).is_none());
    assert!(video.lifecycle().meshes().is_empty());
    assert!(video.lifecycle().textures().is_empty());

    match video.delete_mesh(mesh) {
        Err(Error::MeshHandleInvalid(_)) => {}
        v => panic!("unexpected {:?}", v),
    }
}

#[test]
fn joints() {
    let (mut video, log) = setup(settings());

    match video.apply_joints(&[Matrix4::identity()]) {
        Err(Error::MaterialAbsent) => {}
        v => panic!("unexpected {:?}", v),
    }

    let mut skinned = material(true);
    video.begin_frame(None).unwrap();
    video.apply_material(&mut skinned).unwrap();
    video.apply_joints(&[Matrix4::identity(); 3]).unwrap();
    assert_eq!(log.count(|v| *v == Call::UniformMatrix4Array(9, 3)), 1);

    let mut rigid = Material::new(MaterialHandle::new(2, 1));
    rigid.set_shader(Rc::new(Shader::new(ShaderHandle::new(2, 1), 8)));

    log.clear();
    video.apply_material(&mut rigid).unwrap();
    video.apply_joints(&[Matrix4::identity(); 3]).unwrap();
    assert_eq!(
        log.count(|v| match *v {
            Call::UniformMatrix4Array(_, _) => true,
            _ => false,
        }),
        0
    );
}

#[test]
fn scissor() {
    let (mut video, log) = setup(settings());
    video.begin_frame(None).unwrap();

    log.clear();
    video.set_scissor_region(Vector2::new(4, 4), Vector2::new(16, 16));
    video.disable_scissor();

    assert_eq!(
        log.calls(),
        vec![
            Call::Capability(Capability::ScissorTest, true),
            Call::Scissor(Vector2::new(4, 4), Vector2::new(16, 16)),
            Call::Capability(Capability::ScissorTest, false),
        ]
    );

    video.set_scissor_region(Vector2::new(4, 4), Vector2::new(16, 16));
    video.end_frame(None).unwrap();

    // Clears are never clipped.
    video.begin_frame(None).unwrap();
    assert!(!video.state().is_scissor_testing_enabled());
}

#[test]
fn screen_resolution() {
    let (mut video, log) = setup(settings());
    let mesh = MeshHandle::new(1, 1);
    quad(&mut video, mesh, MeshHint::Immutable);

    let mut material = material(false);
    video.begin_frame(None).unwrap();
    video.apply_material(&mut material).unwrap();
    video.render_vertex_buffer(mesh, Matrix4::identity()).unwrap();
    video.end_frame(None).unwrap();

    log.clear();
    video.on_screen_resolution_changed(Vector2::new(800, 600));
    assert!(video.state().is_invalidated());
    assert_eq!(video.dimensions(), Vector2::new(800, 600));
    assert_eq!(
        log.count(|v| *v == Call::Viewport(Vector2::new(0, 0), Vector2::new(800, 600))),
        1
    );

    // The next application of the same material goes through the full path.
    log.clear();
    video.begin_frame(None).unwrap();
    video.apply_material(&mut material).unwrap();
    assert_eq!(log.count(|v| *v == Call::UseProgram(7)), 1);
}

#[test]
fn error_check() {
    let mut settings = settings();
    settings.check_errors = true;

    let visitor = HeadlessVisitor::new();
    let log = visitor.log();
    let mut video = RenderSystem::new(Box::new(visitor), settings).unwrap();

    assert_eq!(video.check_errors(), 0);

    log.push_error(0x0500);
    log.push_error(0x0505);
    assert_eq!(video.check_errors(), 2);
    assert_eq!(video.check_errors(), 0);

    for _ in 0..40 {
        log.push_error(0x0507);
    }

    assert_eq!(video.check_errors(), 32);

    // Runs at the end of every frame.
    log.push_error(0x0502);
    log.push_error(0x0506);
    video.begin_frame(None).unwrap();
    video.end_frame(None).unwrap();
    assert_eq!(video.check_errors(), 0);
}

#[test]
fn settings_document() {
    let settings = RenderSettings::from_json(
        r#"{ "clear_colour": { "r": 1.0, "g": 0.0, "b": 0.0, "a": 1.0 }, "check_errors": false }"#,
    )
    .unwrap();

    let (mut video, log) = setup(settings);
    video.begin_frame(None).unwrap();
    assert_eq!(log.count(|v| *v == Call::ClearColour(Color::red())), 1);
}

#[test]
fn clear_with_depth_writing_locked() {
    let (mut video, log) = setup(settings());
    let mesh = MeshHandle::new(1, 1);
    quad(&mut video, mesh, MeshHint::Immutable);

    let mut material = material(false);
    let mut flags = RenderFlags::default();
    flags.depth_write = false;
    material.set_flags(flags);

    video.begin_frame(None).unwrap();
    video.apply_material(&mut material).unwrap();
    video.render_vertex_buffer(mesh, Matrix4::identity()).unwrap();
    video.state_mut().lock_depth_writing();
    video.end_frame(None).unwrap();

    // The mask is opened for the clear only.
    log.clear();
    video.begin_frame(None).unwrap();
    assert_eq!(
        log.calls(),
        vec![
            Call::BindFramebuffer(0),
            Call::DepthMask(true),
            Call::Clear(true, true),
            Call::DepthMask(false),
        ]
    );

    assert!(!video.state().is_depth_writing_enabled());
    assert!(video.state().is_depth_writing_locked());
}

#[test]
fn surface_created_while_drawing_into_another() {
    let (mut video, log) = setup(settings());

    let (texture, surface) = (TextureHandle::new(1, 1), SurfaceHandle::new(1, 1));
    render_target(&mut video, texture, surface);

    let fbo = log
        .calls()
        .into_iter()
        .find_map(|v| match v {
            Call::CreateFramebuffer(fbo) => Some(fbo),
            _ => None,
        })
        .unwrap();

    assert!(video.begin_frame(Some(surface)).unwrap());

    log.clear();
    render_target(&mut video, TextureHandle::new(2, 1), SurfaceHandle::new(2, 1));

    let calls = log.calls();
    assert_eq!(calls.last(), Some(&Call::BindFramebuffer(fbo)));
    assert_eq!(log.count(|v| *v == Call::BindFramebuffer(fbo)), 2);
}
