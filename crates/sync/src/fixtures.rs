//! Sample floorplan used by tests, the harness and the command binary.
//!
//! The renderer normally produces the scene and the tagged meshes from the
//! parsed DSL. Here both are built by hand so that source ranges, mesh
//! hierarchy and geometry stay consistent with [`SAMPLE_SOURCE`].

use std::time::Instant;

use glam::Vec3;
use shared::{EntityKey, EntityType, FloorBatch, MeshId, SourceRange, TaggedMesh};

use crate::document::Document;
use crate::scene::SceneGraph;
use crate::state::settings::Preferences;
use crate::sync::editor::BufferEditor;
use crate::viewport::camera::{ArcBallCamera, Viewport};
use crate::viewport::picking::Aabb;

/// Two floors: four rooms, two walls, a door, stairs and a lift on the
/// first; two rooms and the same lift shaft on the second.
pub const SAMPLE_SOURCE: &str = "\
# Sample two-floor plan
floor Floor1 {
  room Kitchen rect (0, 0) (4, 4) {
    wall K_north
    wall K_east
  }
  room Living rect (5, 0) (9, 4)
  room Bedroom rect (10, 0) (14, 4)
  room Bath rect (15, 0) (18, 4)
  connection D1 Kitchen.east Living.west door
  stair S1 rect (0, 6) (2, 9)
  lift L1 rect (3, 6) (5, 8)
}
floor Floor2 {
  room Office rect (0, 0) (6, 4)
  room Storage rect (7, 0) (10, 4)
  lift L1 rect (3, 6) (5, 8)
}
";

/// Vertical distance between floors
pub const FLOOR_HEIGHT: f32 = 3.0;
/// Floor2 is drawn beside Floor1 so both stay visible from above
pub const FLOOR2_OFFSET_X: f32 = 22.0;

const WALL_HEIGHT: f32 = 2.5;
const WALL_THICKNESS: f32 = 0.2;
const PLATE_THICKNESS: f32 = 0.1;

/// Rendered sample: text, scene graph and per-floor tagged meshes
#[derive(Debug, Clone)]
pub struct SampleFloorplan {
    pub source: String,
    pub scene: SceneGraph,
    pub batches: Vec<FloorBatch>,
}

/// Shorthand for entity keys in tests
pub fn key(floor_id: &str, entity_type: EntityType, entity_id: &str) -> EntityKey {
    EntityKey::new(floor_id, entity_type, entity_id)
}

/// The sample as first rendered, mesh ids from 1
pub fn sample_floorplan() -> SampleFloorplan {
    build(0, 1)
}

/// The sample with `extra_lines` comment lines prepended, re-rendered with
/// fresh mesh ids. Every source range moves down by `extra_lines`.
pub fn sample_floorplan_shifted(extra_lines: u32) -> SampleFloorplan {
    build(extra_lines, 1000 + u64::from(extra_lines) * 100)
}

/// Sample text with an unbalanced parenthesis in the Living room
pub fn broken_source() -> String {
    SAMPLE_SOURCE.replacen("(5, 0) (9, 4)", "(5, 0 (9, 4)", 1)
}

/// Plan-style camera framing both floors
pub fn sample_camera() -> ArcBallCamera {
    ArcBallCamera::top_down(Vec3::new(16.0, 0.0, 4.0), 45.0)
}

pub fn sample_viewport() -> Viewport {
    Viewport::new(1280.0, 800.0)
}

/// Document loaded with the sample and the given preferences
pub fn sample_document(prefs: Preferences, now: Instant) -> Document<BufferEditor> {
    let plan = sample_floorplan();
    let mut doc = Document::new(BufferEditor::new(plan.source.clone()), prefs);
    *doc.camera_mut() = sample_camera();
    doc.set_viewport(sample_viewport());
    doc.apply_parse_success(plan.scene, &plan.batches, now);
    doc
}

fn shifted_source(extra_lines: u32) -> String {
    let mut source = String::new();
    for i in 0..extra_lines {
        source.push_str(&format!("# note {}\n", i + 1));
    }
    source.push_str(SAMPLE_SOURCE);
    source
}

fn build(extra_lines: u32, first_mesh: u64) -> SampleFloorplan {
    let source = shifted_source(extra_lines);
    let mut b = Builder {
        lines: source.lines().map(str::to_owned).collect(),
        offset: extra_lines,
        next_mesh: first_mesh,
        scene: SceneGraph::new(),
        batches: Vec::new(),
        last_child: MeshId(0),
    };

    let ground = b.mesh_id();
    b.scene.add_mesh(
        ground,
        None,
        Aabb::new(Vec3::new(-20.0, -0.3, -20.0), Vec3::new(60.0, -0.2, 30.0)),
    );

    // Floor1
    b.begin_floor("Floor1");
    let elev = 0.0;
    let kitchen = b.room(2, 5, "Kitchen", elev, 0.0, [0.0, 0.0, 4.0, 4.0]);
    // Unregistered detail two levels below the room group
    let plate = b.last_child;
    let trim = b.mesh_id();
    b.scene.add_mesh(
        trim,
        Some(plate),
        Aabb::new(Vec3::new(1.5, elev + PLATE_THICKNESS, 1.5), Vec3::new(2.5, elev + 0.12, 2.5)),
    );
    b.solid(
        Some(kitchen),
        EntityType::Wall,
        "K_north",
        3,
        3,
        vec![Aabb::new(
            Vec3::new(0.0, elev, -WALL_THICKNESS / 2.0),
            Vec3::new(4.0, elev + WALL_HEIGHT, WALL_THICKNESS / 2.0),
        )],
    );
    b.solid(
        Some(kitchen),
        EntityType::Wall,
        "K_east",
        4,
        4,
        vec![Aabb::new(
            Vec3::new(4.0 - WALL_THICKNESS / 2.0, elev, 0.0),
            Vec3::new(4.0 + WALL_THICKNESS / 2.0, elev + WALL_HEIGHT, 4.0),
        )],
    );
    b.room(6, 6, "Living", elev, 0.0, [5.0, 0.0, 9.0, 4.0]);
    b.room(7, 7, "Bedroom", elev, 0.0, [10.0, 0.0, 14.0, 4.0]);
    b.room(8, 8, "Bath", elev, 0.0, [15.0, 0.0, 18.0, 4.0]);
    b.solid(
        None,
        EntityType::Connection,
        "D1",
        9,
        9,
        vec![Aabb::new(Vec3::new(4.2, elev, 1.5), Vec3::new(4.8, elev + 2.1, 2.5))],
    );
    // Flight and landing: one entity, two meshes
    b.solid(
        None,
        EntityType::Stair,
        "S1",
        10,
        10,
        vec![
            Aabb::new(Vec3::new(0.0, elev, 6.0), Vec3::new(2.0, elev + 1.5, 8.0)),
            Aabb::new(Vec3::new(0.0, elev, 8.0), Vec3::new(2.0, elev + 1.5, 9.0)),
        ],
    );
    b.solid(
        None,
        EntityType::Lift,
        "L1",
        11,
        11,
        vec![Aabb::new(Vec3::new(3.0, elev, 6.0), Vec3::new(5.0, elev + FLOOR_HEIGHT, 8.0))],
    );

    // Floor2
    b.begin_floor("Floor2");
    let elev = FLOOR_HEIGHT;
    let dx = FLOOR2_OFFSET_X;
    b.room(14, 14, "Office", elev, dx, [0.0, 0.0, 6.0, 4.0]);
    b.room(15, 15, "Storage", elev, dx, [7.0, 0.0, 10.0, 4.0]);
    b.solid(
        None,
        EntityType::Lift,
        "L1",
        16,
        16,
        vec![Aabb::new(
            Vec3::new(dx + 3.0, elev, 6.0),
            Vec3::new(dx + 5.0, elev + FLOOR_HEIGHT, 8.0),
        )],
    );

    SampleFloorplan {
        source,
        scene: b.scene,
        batches: b.batches,
    }
}

struct Builder {
    lines: Vec<String>,
    offset: u32,
    next_mesh: u64,
    scene: SceneGraph,
    batches: Vec<FloorBatch>,
    last_child: MeshId,
}

impl Builder {
    fn mesh_id(&mut self) -> MeshId {
        let id = MeshId(self.next_mesh);
        self.next_mesh += 1;
        id
    }

    fn begin_floor(&mut self, floor_id: &str) {
        self.batches.push(FloorBatch {
            floor_id: floor_id.to_string(),
            meshes: Vec::new(),
        });
    }

    /// Range from the first non-blank column of `start` to the end of `end`
    fn range(&self, start: u32, end: u32) -> SourceRange {
        let line = |i: u32| {
            self.lines
                .get((i + self.offset) as usize)
                .map(String::as_str)
                .unwrap_or("")
        };
        let start_text = line(start);
        let indent = start_text.len() - start_text.trim_start().len();
        SourceRange::new(
            start + self.offset,
            indent as u32,
            end + self.offset,
            line(end).len() as u32,
        )
    }

    fn tag(
        &mut self,
        mesh: MeshId,
        entity_type: EntityType,
        entity_id: &str,
        start: u32,
        end: u32,
    ) {
        let source_range = Some(self.range(start, end));
        if let Some(batch) = self.batches.last_mut() {
            batch.meshes.push(TaggedMesh {
                mesh,
                entity_type,
                entity_id: entity_id.to_string(),
                source_range,
            });
        }
    }

    /// Room group (registered) with an unregistered floor plate beneath it
    fn room(
        &mut self,
        start: u32,
        end: u32,
        id: &str,
        elev: f32,
        dx: f32,
        [x0, z0, x1, z1]: [f32; 4],
    ) -> MeshId {
        let group = self.mesh_id();
        self.scene.add_group(group, None);
        let plate = self.mesh_id();
        self.scene.add_mesh(
            plate,
            Some(group),
            Aabb::new(
                Vec3::new(x0 + dx, elev, z0),
                Vec3::new(x1 + dx, elev + PLATE_THICKNESS, z1),
            ),
        );
        self.last_child = plate;
        self.tag(group, EntityType::Room, id, start, end);
        group
    }

    fn solid(
        &mut self,
        parent: Option<MeshId>,
        entity_type: EntityType,
        id: &str,
        start: u32,
        end: u32,
        boxes: Vec<Aabb>,
    ) {
        for bounds in boxes {
            let mesh = self.mesh_id();
            self.scene.add_mesh(mesh, parent, bounds);
            self.tag(mesh, entity_type, id, start, end);
        }
    }
}
