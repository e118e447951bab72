extern crate crayon_renderstate;
extern crate env_logger;

use std::rc::Rc;
use std::thread;

use crayon_renderstate::prelude::*;

fn setup(context_loss: bool) -> (RenderSystem, HeadlessLog) {
    let _ = env_logger::try_init();

    let visitor = HeadlessVisitor::new();
    let log = visitor.log();

    let mut settings = RenderSettings::default();
    settings.context_loss = context_loss;
    settings.check_errors = false;

    let video = RenderSystem::new(Box::new(visitor), settings).unwrap();
    (video, log)
}

fn triangle(video: &mut RenderSystem, handle: MeshHandle) -> MeshData {
    let mut params = MeshParams::default();
    params.hint = MeshHint::Dynamic;
    params.layout = VertexLayout::build()
        .with(Attribute::Position, VertexFormat::Float, 2, false)
        .finish();
    params.num_verts = 3;
    params.num_idxes = 3;

    let data = MeshData {
        vptr: (0..24).collect(),
        iptr: MeshData::indices(&[0, 1, 2]),
    };

    video.create_mesh(handle, params, Some(data.clone())).unwrap();
    data
}

fn checker(video: &mut RenderSystem, handle: TextureHandle) -> TextureData {
    let mut params = TextureParams::default();
    params.dimensions = Vector2::new(2, 2);

    let data = TextureData {
        faces: vec![vec![0, 255, 0, 255, 255, 0, 255, 0, 0, 255, 0, 255, 255, 0, 255, 0]],
    };

    video.create_texture(handle, params, Some(data.clone())).unwrap();
    data
}

fn created(log: &HeadlessLog) -> (Vec<(u32, u32)>, Vec<u32>, Vec<u32>) {
    let (mut buffers, mut textures, mut surfaces) = (Vec::new(), Vec::new(), Vec::new());
    for v in log.calls() {
        match v {
            Call::CreateBuffers(vbo, ibo) => buffers.push((vbo, ibo)),
            Call::CreateTexture(id) => textures.push(id),
            Call::CreateFramebuffer(fbo) => surfaces.push(fbo),
            _ => {}
        }
    }

    (buffers, textures, surfaces)
}

fn position<F>(calls: &[Call], predicate: F) -> usize
where
    F: Fn(&Call) -> bool,
{
    calls.iter().position(|v| predicate(v)).unwrap()
}

#[test]
fn round_trip() {
    let (mut video, log) = setup(true);

    let mesh = MeshHandle::new(1, 1);
    let texture = TextureHandle::new(1, 1);
    let surface = SurfaceHandle::new(1, 1);

    let vertices = triangle(&mut video, mesh);
    let pixels = checker(&mut video, texture);
    video
        .create_surface(
            surface,
            SurfaceParams {
                colour: texture,
                depth: true,
            },
        )
        .unwrap();

    video.suspend();
    assert!(!video.has_context());
    assert_eq!(video.lifecycle().state(), ContextState::BackedUp);

    log.lose_context();
    assert_eq!(log.buffers(), 0);
    log.clear();

    video.resume().unwrap();
    assert!(video.has_context());
    assert!(video.state().is_invalidated());

    let calls = log.calls();
    assert_eq!(calls[0], Call::ResetContext);

    let b = position(&calls, |v| match *v {
        Call::CreateBuffers(_, _) => true,
        _ => false,
    });
    let t = position(&calls, |v| match *v {
        Call::CreateTexture(_) => true,
        _ => false,
    });
    let s = position(&calls, |v| match *v {
        Call::CreateFramebuffer(_) => true,
        _ => false,
    });
    assert!(b < t && t < s);

    let (buffers, textures, surfaces) = created(&log);
    assert_eq!(buffers.len(), 1);
    assert_eq!(textures.len(), 1);
    assert_eq!(surfaces.len(), 1);

    let (vbo, ibo) = buffers[0];
    assert_eq!(log.buffer_bytes(vbo), Some(vertices.vptr));
    assert_eq!(log.buffer_bytes(ibo), Some(vertices.iptr));
    assert_eq!(log.texture_data(textures[0]), Some(pixels));
    assert_eq!(log.framebuffers(), 1);

    // Handles are stable across the loss, only the GPU names changed.
    assert!(video.mesh(mesh).is_some());
    assert!(video.texture(texture).is_some());
    assert!(video.begin_frame(Some(surface)).unwrap());
    assert_eq!(log.count(|v| *v == Call::BindFramebuffer(surfaces[0])), 1);
    video.end_frame(Some(surface)).unwrap();
}

#[test]
fn restored_meshes_draw() {
    let (mut video, log) = setup(true);

    let mesh = MeshHandle::new(1, 1);
    triangle(&mut video, mesh);

    let shader = Shader::new(ShaderHandle::new(1, 1), 7).with_attribute(Attribute::Position, 0);
    let mut material = Material::new(MaterialHandle::new(1, 1));
    material.set_shader(Rc::new(shader));

    video.begin_frame(None).unwrap();
    video.apply_material(&mut material).unwrap();
    video.render_vertex_buffer(mesh, Matrix4::identity()).unwrap();
    video.end_frame(None).unwrap();

    video.suspend();
    log.lose_context();
    video.resume().unwrap();
    assert_eq!(video.session().material(), None);

    log.clear();
    video.begin_frame(None).unwrap();
    video.apply_material(&mut material).unwrap();
    video.render_vertex_buffer(mesh, Matrix4::identity()).unwrap();

    assert_eq!(video.lifecycle().meshes().len(), 1);

    let calls = log.calls();
    let vbo = calls.iter().find_map(|v| match *v {
        Call::BindVertexBuffer(id) => Some(id),
        _ => None,
    });
    let ibo = calls.iter().find_map(|v| match *v {
        Call::BindIndexBuffer(id) => Some(id),
        _ => None,
    });

    let (vbo, ibo) = (vbo.unwrap(), ibo.unwrap());

    assert!(log.buffer_bytes(vbo).is_some());
    assert!(log.buffer_bytes(ibo).is_some());
    assert_eq!(log.count(|v| *v == Call::UseProgram(7)), 1);
    assert_eq!(
        log.count(|v| match *v {
            Call::VertexAttribPointer { slot: 0, .. } => true,
            _ => false,
        }),
        1
    );
}

#[test]
fn nothing_is_drawn_while_suspended() {
    let (mut video, log) = setup(true);

    let mesh = MeshHandle::new(1, 1);
    triangle(&mut video, mesh);

    video.suspend();
    log.clear();

    assert!(!video.begin_frame(None).unwrap());
    video.render_vertex_buffer(mesh, Matrix4::identity()).unwrap();
    video.end_frame(None).unwrap();
    assert!(log.calls().is_empty());

    match video.create_mesh(MeshHandle::new(2, 1), MeshParams::default(), None) {
        Err(Error::ContextLost) => {}
        v => panic!("unexpected {:?}", v),
    }

    match video.create_texture(TextureHandle::new(1, 1), TextureParams::default(), None) {
        Err(Error::ContextLost) => {}
        v => panic!("unexpected {:?}", v),
    }

    match video.update_mesh(mesh, 0, &[0; 4]) {
        Err(Error::ContextLost) => {}
        v => panic!("unexpected {:?}", v),
    }
}

#[test]
fn idempotent_suspend() {
    let (mut video, log) = setup(true);
    checker(&mut video, TextureHandle::new(1, 1));

    video.suspend();
    log.lose_context();

    // The second capture would read nothing back, and must not replace the first.
    video.suspend();
    video.resume().unwrap();
    video.resume().unwrap();

    let (_, textures, _) = created(&log);
    assert_eq!(textures.len(), 2);
    assert_eq!(log.count(|v| *v == Call::ResetContext), 1);
    assert_eq!(log.texture_data(textures[1]).map(|v| v.faces[0][1]), Some(255));
}

#[test]
fn deleted_while_suspended() {
    let (mut video, log) = setup(true);

    let (m1, m2) = (MeshHandle::new(1, 1), MeshHandle::new(2, 1));
    triangle(&mut video, m1);
    triangle(&mut video, m2);

    video.suspend();
    log.lose_context();
    video.delete_mesh(m1).unwrap();
    assert_eq!(video.lifecycle().meshes(), &[m2]);

    log.clear();
    video.resume().unwrap();
    let (buffers, _, _) = created(&log);
    assert_eq!(buffers.len(), 1);
    assert!(video.mesh(m1).is_none());
}

#[test]
fn disabled() {
    let (mut video, log) = setup(false);
    checker(&mut video, TextureHandle::new(1, 1));

    log.clear();
    video.suspend();
    assert!(video.has_context());
    video.resume().unwrap();

    assert!(log.calls().is_empty());
    assert_eq!(video.lifecycle().state(), ContextState::Active);
}

#[test]
fn signal_from_another_thread() {
    let (mut video, log) = setup(true);
    checker(&mut video, TextureHandle::new(1, 1));

    let signal = video.signal();
    thread::spawn(move || signal.request_suspend())
        .join()
        .unwrap();

    assert!(video.has_context());
    assert!(!video.begin_frame(None).unwrap());
    assert!(!video.has_context());

    log.lose_context();
    let signal = video.signal();
    thread::spawn(move || signal.request_resume())
        .join()
        .unwrap();

    assert!(video.begin_frame(None).unwrap());
    assert!(video.has_context());
    assert_eq!(log.textures(), 1);
}

#[test]
fn requests_served_at_end_of_frame() {
    let (mut video, _) = setup(true);

    assert!(video.begin_frame(None).unwrap());
    video.signal().request_suspend();
    video.end_frame(None).unwrap();
    assert!(!video.has_context());

    video.signal().request_resume();
    video.signal().request_suspend();
    video.signal().request_resume();
    assert!(video.begin_frame(None).unwrap());
}
