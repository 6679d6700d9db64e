use criterion::{Criterion, black_box, criterion_group, criterion_main};

use glam::Vec3;
use scenecast::commands::{Command, SetObject, SetTransform};
use scenecast::geometry::{Geometry, NumericArray, PointsMaterial, point_cloud};
use scenecast::Path;
use scenecast_bridge::{CommandKind, SceneTree};

fn cloud(n: usize) -> Vec<Vec3> {
    (0..n)
        .map(|i| {
            let t = i as f32 * 0.01;
            Vec3::new(t.cos(), t.sin(), t)
        })
        .collect()
}

fn bench_lower_box(c: &mut Criterion) {
    let cmd = Command::from(
        SetObject::new(Geometry::box_geometry([1.0, 1.0, 1.0]), None, Path::parse("/meshcat/box")).unwrap(),
    );

    c.bench_function("encode_box", |b| {
        b.iter(|| black_box(&cmd).encode().unwrap());
    });
}

fn bench_lower_point_cloud(c: &mut Criterion) {
    let points = cloud(100_000);
    let object = point_cloud(
        NumericArray::from_points(&points),
        Some(NumericArray::from_points(&points)),
        PointsMaterial::default(),
    );
    let cmd = Command::from(SetObject::new(object, None, Path::parse("/meshcat/cloud")).unwrap());

    c.bench_function("encode_point_cloud_100k", |b| {
        b.iter(|| black_box(&cmd).encode().unwrap());
    });
}

fn bench_replay(c: &mut Criterion) {
    let mut tree = SceneTree::new();
    for i in 0..1000 {
        let path = Path::parse(&format!("/meshcat/group{}/item{}", i % 10, i));
        let cmd = Command::from(SetTransform::new(glam::DMat4::IDENTITY, path.clone()));
        let blob = cmd.encode().unwrap();
        tree.apply(CommandKind::SetTransform, &path, blob.into());
    }

    c.bench_function("replay_1000_nodes", |b| {
        b.iter(|| black_box(&tree).replay());
    });
}

criterion_group!(benches, bench_lower_box, bench_lower_point_cloud, bench_replay);
criterion_main!(benches);
