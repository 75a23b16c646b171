//! Filesystem store tests.

use trickle_core::codec::encode_values;
use trickle_core::store::{ByteSink, ByteSource};
use trickle_core::*;

#[test]
fn test_write_read_rewind() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirStore::new(dir.path());

    let mut writer = store.open_write(StreamKey::named("t.txt")).unwrap();
    writer.write_bytes(b"1.5\n-2\n").unwrap();
    writer.flush().unwrap();
    drop(writer);

    let mut reader = store.open_read(StreamKey::named("t.txt")).unwrap();
    assert_eq!(codec::read_f32(&mut reader).unwrap(), Some(1.5));
    assert_eq!(codec::read_f32(&mut reader).unwrap(), Some(-2.0));
    assert_eq!(codec::read_f32(&mut reader).unwrap(), None);
    reader.rewind().unwrap();
    assert_eq!(reader.read_byte().unwrap(), Some(b'1'));
}

#[test]
fn test_paths_and_channel_names() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirStore::new(dir.path());
    assert_eq!(store.root(), dir.path());
    assert_eq!(store.path(StreamKey::named("/w01.txt")), dir.path().join("w01.txt"));
    assert_eq!(
        store.path(StreamKey::channel("conv1.txt", 3)),
        dir.path().join("conv1_003.txt")
    );
}

#[test]
fn test_missing_and_remove() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirStore::new(dir.path());
    assert_eq!(
        store.open_read(StreamKey::named("nope.txt")).err(),
        Some(StoreError::NotFound)
    );

    let mut accum = [0.0f32; 1];
    let engine = Engine::new(&store, ScratchPool::accumulator_only(&mut accum));
    engine.write_tensor("a.txt", &[1.0]).unwrap();
    assert!(dir.path().join("a.txt").exists());
    engine.remove("a.txt").unwrap();
    engine.remove("a.txt").unwrap();
    assert!(!dir.path().join("a.txt").exists());
}

#[test]
fn test_nested_names_create_directories() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirStore::new(dir.path());
    let mut accum = [0.0f32; 1];
    let engine = Engine::new(&store, ScratchPool::accumulator_only(&mut accum));
    engine.write_tensor("model/fc/b.txt", &[0.25, 0.5]).unwrap();
    let mut back = [0.0f32; 2];
    engine.read_tensor("model/fc/b.txt", &mut back).unwrap();
    assert_eq!(back, [0.25, 0.5]);
}

#[test]
fn test_conv_over_files_matches_memory() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirStore::new(dir.path());
    let input: Vec<f32> = (0..2 * 36).map(|i| ((i * 5) % 9) as f32 * 0.5 - 2.0).collect();
    let weights: Vec<f32> = (0..4 * 2 * 9).map(|i| ((i * 3) % 7) as f32 * 0.25 - 0.75).collect();
    let bias = [0.0, 0.25, -0.25, 0.5];

    let (mut plane, mut accum) = ([0.0f32; 36], [0.0f32; 36]);
    let mut engine = Engine::new(&store, ScratchPool::new(&mut plane, &mut accum))
        .with_config(EngineConfig::new(PoolMode::Max));
    engine.write_tensor("in.txt", &input).unwrap();
    engine.write_tensor("w.txt", &weights).unwrap();
    engine.write_tensor("b.txt", &bias).unwrap();

    let mut reference = vec![0.0f32; 4 * 9];
    let conv = Conv::memory(3, &weights, &bias).padding(Padding::Same);
    let wo = engine
        .conv2d(TensorIn::F32(&input), 2, TensorOut::Memory(&mut reference), 4, 6, &conv, &Pool::new(2, 2))
        .unwrap();
    assert_eq!(wo, 3);

    let conv = Conv::stream(3, "w.txt", "b.txt").padding(Padding::Same);
    engine
        .conv2d(TensorIn::Stream("in.txt"), 2, TensorOut::Channels("act.txt"), 4, 6, &conv, &Pool::new(2, 2))
        .unwrap();
    for c in 0..4 {
        let bytes = std::fs::read(dir.path().join(format!("act_{c:03}.txt"))).unwrap();
        assert_eq!(bytes, encode_values(&reference[c * 9..(c + 1) * 9]));
    }

    let mut flat = vec![0.0f32; 36];
    engine.flatten(TensorIn::Channels("act.txt"), 3, 4, &mut flat).unwrap();
    let mut expected = vec![0.0f32; 36];
    flatten_planes(&reference, 3, 4, &mut expected).unwrap();
    for (a, b) in flat.iter().zip(expected.iter()) {
        assert!((a - b).abs() <= 5e-7, "{a} vs {b}");
    }
}
