use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;
use three_d::control::OrbitControl;
use three_d::degrees;
use three_d::vec3;
use three_d::{AmbientLight, DirectionalLight};
use three_d::{Camera, ClearState, Context, FrameOutput, Mat4, Vec3};
use three_d::{CpuMaterial, CpuMesh, CpuTexture, Gm, Indices, Mesh, Object, PhysicalMaterial, Positions, Srgba, TextureData};
use three_d::{Event, Key};
use three_d::{Window, WindowSettings};
use tracing::info;

use crate::draw::config::{DrawConfig, Rgba};
use crate::geom::volume::Volume;
use crate::massing::building::Neighborhood3D;
use crate::scene::basemap::GROUND_HALF_EXTENT;
use crate::scene::builder::SceneBuilder;
use crate::scene::camera::{CameraPose, CameraPreset};
use crate::scene::resources::{RenderError, RenderResources, ResourceHandle};
use crate::sim::solar::control::{DatePreset, SunControl};
use crate::sim::solar::light::LightState;
use crate::snapshot::raster::Raster;
use crate::{Point, Vector};

const MAX_DISTANCE: f32 = 5000.0;


fn to_vec3(p: Point) -> Vec3 {
    vec3(p.x as f32, p.y as f32, p.z as f32)
}

fn dir_to_vec3(v: Vector) -> Vec3 {
    vec3(v.dx as f32, v.dy as f32, v.dz as f32)
}

fn to_srgba(c: Rgba) -> Srgba {
    let byte = |x: f32| (x.clamp(0.0, 1.0) * 255.0).round() as u8;
    Srgba::new(byte(c.0), byte(c.1), byte(c.2), byte(c.3))
}

/// Volume meshes uploaded to the GPU, one object per handle.
pub struct GpuResources {
    context: Context,
    next_id: u64,
    objects: HashMap<ResourceHandle, Gm<Mesh, PhysicalMaterial>>,
    target_material: CpuMaterial,
    neighbor_material: CpuMaterial,
}

impl GpuResources {
    pub fn new(context: &Context, config: &DrawConfig) -> Self {
        let material = |color: Rgba| CpuMaterial {
            albedo: to_srgba(color),
            roughness: config.roughness,
            metallic: 0.0,
            ..Default::default()
        };
        Self {
            context: context.clone(),
            next_id: 0,
            objects: HashMap::new(),
            target_material: material(config.target_color),
            neighbor_material: material(config.neighbor_color),
        }
    }

    pub fn objects(&self) -> impl Iterator<Item = &dyn Object> {
        self.objects.values().map(|gm| gm as &dyn Object)
    }

    pub fn meshes(&self) -> impl Iterator<Item = &Mesh> {
        self.objects.values().map(|gm| &gm.geometry)
    }
}

impl RenderResources for GpuResources {
    fn create_volume(&mut self, volume: &Volume) -> Result<ResourceHandle, RenderError> {
        let mesh = volume.mesh().map_err(|e| RenderError::Mesh {
            id: volume.id.clone(),
            message: e.to_string(),
        })?;
        let cpu = CpuMesh {
            positions: Positions::F64(mesh.positions.iter().map(|p| vec3(p.x, p.y, p.z)).collect()),
            normals: Some(mesh.normals.iter().map(|n| dir_to_vec3(*n)).collect()),
            indices: Indices::U32(
                mesh.indices
                    .iter()
                    .flat_map(|t| [t.0 as u32, t.1 as u32, t.2 as u32])
                    .collect(),
            ),
            ..Default::default()
        };
        let material = if volume.is_target {
            &self.target_material
        } else {
            &self.neighbor_material
        };
        let gm = Gm::new(
            Mesh::new(&self.context, &cpu),
            PhysicalMaterial::new_opaque(&self.context, material),
        );
        self.next_id += 1;
        let handle = ResourceHandle(self.next_id);
        self.objects.insert(handle, gm);
        Ok(handle)
    }

    fn dispose(&mut self, handle: ResourceHandle) {
        self.objects.remove(&handle);
    }

    fn live_count(&self) -> usize {
        self.objects.len()
    }
}

fn apply_pose(camera: &mut Camera, pose: &CameraPose) {
    camera.set_view(to_vec3(pose.position), to_vec3(pose.target), dir_to_vec3(pose.up));
}

fn apply_light(light: &mut DirectionalLight, state: &LightState) {
    light.intensity = state.intensity;
    light.direction = dir_to_vec3(state.direction);
}

/// Opens a window on `neighborhood` and runs until it is closed.
///
/// Keys: left/right arrows move the hour, 1-4 pick winter solstice,
/// equinox, summer solstice and today, `T` and `O` switch between top-down
/// and overview camera. `ground_tile` textures the ground when present and
/// must cover [`GROUND_HALF_EXTENT`] around the neighborhood center.
pub fn run_viewer(
    neighborhood: &Neighborhood3D,
    ground_tile: Option<&Raster>,
    mut sun: SunControl,
    today: NaiveDate,
    config: &DrawConfig,
) -> Result<()> {
    let window = Window::new(WindowSettings {
        title: config.title.clone(),
        ..Default::default()
    })?;
    let context = window.gl();

    let mut builder = SceneBuilder::new(GpuResources::new(&context, config));
    builder.set_massing(neighborhood)?;
    sun.latitude = neighborhood.center.lat;
    sun.longitude = neighborhood.center.lng;
    let light_state = sun.apply(builder.state_mut());

    let focus = builder.state().focus();
    let ground_z = builder.state().framing().map_or(0.0, |f| f.ground) as f32;
    // Local coordinates put the neighborhood center, and the tile center, at the origin
    let mut ground_cpu = CpuMesh::square();
    ground_cpu.transform(Mat4::from_translation(vec3(0.0, 0.0, ground_z)) * Mat4::from_scale(GROUND_HALF_EXTENT as f32))?;
    let ground_material = match ground_tile {
        Some(tile) => CpuMaterial {
            albedo: Srgba::WHITE,
            albedo_texture: Some(CpuTexture {
                data: TextureData::RgbaU8(tile.texels()),
                width: tile.width,
                height: tile.height,
                ..Default::default()
            }),
            roughness: 1.0,
            metallic: 0.0,
            ..Default::default()
        },
        None => CpuMaterial {
            albedo: to_srgba(config.ground_color),
            roughness: 1.0,
            metallic: 0.0,
            ..Default::default()
        },
    };
    let ground = Gm::new(
        Mesh::new(&context, &ground_cpu),
        PhysicalMaterial::new_opaque(&context, &ground_material),
    );
    info!(textured = ground_tile.is_some(), "Ground plane ready");

    let pose = *builder.state().camera();
    let mut camera = Camera::new_perspective(
        window.viewport(),
        to_vec3(pose.position),
        to_vec3(pose.target),
        dir_to_vec3(pose.up),
        degrees(pose.fov_degrees as f32),
        0.1,
        MAX_DISTANCE,
    );
    let mut control = OrbitControl::new(to_vec3(focus), 1.0, MAX_DISTANCE);

    let ambient = AmbientLight::new(&context, config.ambient_intensity, Srgba::WHITE);
    let mut directional = DirectionalLight::new(
        &context,
        light_state.intensity,
        Srgba::WHITE,
        dir_to_vec3(light_state.direction),
    );
    let shadow_map_size = config.shadow_map_size;
    directional.generate_shadow_map(shadow_map_size, builder.resources().meshes());

    let background = config.background;
    let hour_step = config.hour_step;
    info!(hour = sun.hour, date = %sun.date, "Viewer opened");

    window.render_loop(move |mut frame_input| {
        let mut light_changed = None;
        let mut preset = None;
        for event in frame_input.events.iter_mut() {
            if let Event::KeyPress { kind, handled, .. } = event {
                let state = builder.state_mut();
                let changed = match kind {
                    Key::ArrowRight => Some(sun.set_hour(sun.hour + hour_step, state)),
                    Key::ArrowLeft => Some(sun.set_hour(sun.hour - hour_step, state)),
                    Key::Num1 => Some(sun.set_preset(DatePreset::WinterSolstice, today, state)),
                    Key::Num2 => Some(sun.set_preset(DatePreset::Equinox, today, state)),
                    Key::Num3 => Some(sun.set_preset(DatePreset::SummerSolstice, today, state)),
                    Key::Num4 => Some(sun.set_preset(DatePreset::Today, today, state)),
                    Key::T => {
                        preset = Some(CameraPreset::TopDown);
                        None
                    }
                    Key::O => {
                        preset = Some(CameraPreset::Overview);
                        None
                    }
                    _ => continue,
                };
                if changed.is_some() {
                    light_changed = changed;
                }
                *handled = true;
            }
        }

        if let Some(preset) = preset {
            if builder.apply_preset(preset) {
                apply_pose(&mut camera, builder.state().camera());
            }
        }
        if let Some(light) = light_changed {
            apply_light(&mut directional, &light);
            directional.generate_shadow_map(shadow_map_size, builder.resources().meshes());
            info!(hour = sun.hour, date = %sun.date, altitude = sun.position().altitude, "Sun moved");
        }

        camera.set_viewport(frame_input.viewport);
        control.handle_events(&mut camera, &mut frame_input.events);

        frame_input
            .screen()
            .clear(ClearState::color_and_depth(
                background.0,
                background.1,
                background.2,
                background.3,
                1.0,
            ))
            .render(
                &camera,
                builder.resources().objects().chain(&ground),
                &[&ambient, &directional],
            );

        FrameOutput::default()
    });
    Ok(())
}
