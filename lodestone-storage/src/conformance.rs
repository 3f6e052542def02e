//! Behaviour every storing provider must show, run against each backend.

use std::collections::HashMap;
use std::sync::Arc;

use fastnbt::Value;

use lodestone_world::{BlockPos, Chunk, ChunkPos, Compound, Difficulty, Entity, GameMode, Provider, Section};

pub fn record(id: &str) -> Compound {
    Compound::from([("id".to_string(), Value::String(id.to_string()))])
}

fn sample_chunk(block: &str) -> Chunk {
    Chunk::new(vec![
        Section::filled(-4, "minecraft:bedrock", "minecraft:plains"),
        Section::filled(-3, block, "minecraft:plains"),
    ])
}

pub fn run_all(provider: &dyn Provider) {
    never_saved_is_absent(provider);
    chunk_round_trip(provider);
    chunk_overwrite(provider);
    entities_replace(provider);
    block_nbt_round_trip(provider);
    settings_last_write_wins(provider);
}

pub fn never_saved_is_absent(provider: &dyn Provider) {
    let pos = ChunkPos::new(1000, -1000);
    assert!(provider.load_chunk(pos).unwrap().is_none());
    assert!(provider.load_entities(pos).unwrap().is_empty());
    assert!(provider.load_block_nbt(pos).unwrap().is_empty());
}

pub fn chunk_round_trip(provider: &dyn Provider) {
    let pos = ChunkPos::new(-2, 5);
    let chunk = sample_chunk("minecraft:stone");
    provider.save_chunk(pos, &chunk).unwrap();
    assert_eq!(provider.load_chunk(pos).unwrap(), Some(chunk));
    // Neighbours stay absent
    assert!(provider.load_chunk(ChunkPos::new(-2, 6)).unwrap().is_none());
}

pub fn chunk_overwrite(provider: &dyn Provider) {
    let pos = ChunkPos::new(7, 7);
    provider.save_chunk(pos, &sample_chunk("minecraft:dirt")).unwrap();
    provider.save_chunk(pos, &sample_chunk("minecraft:gravel")).unwrap();
    assert_eq!(provider.load_chunk(pos).unwrap(), Some(sample_chunk("minecraft:gravel")));
}

pub fn entities_replace(provider: &dyn Provider) {
    let pos = ChunkPos::new(3, -9);
    let first = vec![Entity::new("minecraft:cow"), Entity::new("minecraft:pig")];
    let second = vec![Entity::new("minecraft:creeper").with_position([48.5, 70.0, -140.5])];

    provider.save_entities(pos, &first).unwrap();
    assert_eq!(provider.load_entities(pos).unwrap(), first);

    provider.save_entities(pos, &second).unwrap();
    assert_eq!(provider.load_entities(pos).unwrap(), second);
}

pub fn block_nbt_round_trip(provider: &dyn Provider) {
    let pos = ChunkPos::new(2, 3);
    provider
        .save_block_nbt(pos, &HashMap::from([([1, 64, 2], record("chest"))]))
        .unwrap();

    let records = provider.load_block_nbt(pos).unwrap();
    assert_eq!(records.len(), 1);
    let chest = &records[0];
    assert_eq!(chest["id"], Value::String("chest".to_string()));
    assert_eq!(
        (&chest["x"], &chest["y"], &chest["z"]),
        (&Value::Int(1), &Value::Int(64), &Value::Int(2))
    );

    // Full replace, not merge
    provider
        .save_block_nbt(pos, &HashMap::from([([4, 60, 4], record("furnace")), ([5, 60, 4], record("hopper"))]))
        .unwrap();
    let mut ids: Vec<_> = provider
        .load_block_nbt(pos)
        .unwrap()
        .into_iter()
        .filter_map(|r| match r.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            _ => None,
        })
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["furnace", "hopper"]);
}

pub fn settings_last_write_wins(provider: &dyn Provider) {
    provider.set_world_spawn(BlockPos::new(0, 30, 0));
    assert_eq!(provider.world_spawn(), BlockPos::new(0, 30, 0));
    provider.set_world_spawn(BlockPos::new(-8, 72, 19));
    assert_eq!(provider.world_spawn(), BlockPos::new(-8, 72, 19));

    provider.set_world_name("first");
    provider.set_world_name("second");
    assert_eq!(provider.world_name(), "second");

    provider.save_time(24_000);
    assert_eq!(provider.load_time(), 24_000);
    provider.save_time_cycle(false);
    assert!(!provider.load_time_cycle());
    provider.save_time_cycle(true);
    assert!(provider.load_time_cycle());

    provider.save_default_game_mode(GameMode::Spectator);
    assert_eq!(provider.load_default_game_mode(), GameMode::Spectator);
    provider.save_difficulty(Difficulty::Easy);
    assert_eq!(provider.load_difficulty(), Difficulty::Easy);

    // Independent of each other
    assert_eq!(provider.world_spawn(), BlockPos::new(-8, 72, 19));
    assert_eq!(provider.world_name(), "second");
}

/// Writers on distinct positions (some sharing a region) in parallel.
pub fn concurrent_positions(provider: Arc<dyn Provider>) {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let provider = Arc::clone(&provider);
            std::thread::spawn(move || {
                for round in 0..5 {
                    let pos = ChunkPos::new(i * 3, round * 40);
                    let chunk = Chunk::new(vec![Section::filled(i as i8, "minecraft:stone", "minecraft:plains")]);
                    provider.save_chunk(pos, &chunk).unwrap();
                    provider.save_entities(pos, &[Entity::new("minecraft:bee")]).unwrap();
                    assert_eq!(provider.load_chunk(pos).unwrap(), Some(chunk));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    for i in 0..8 {
        for round in 0..5 {
            let pos = ChunkPos::new(i * 3, round * 40);
            let chunk = provider.load_chunk(pos).unwrap().unwrap();
            assert_eq!(chunk.sections[0].y, i as i8);
            assert_eq!(provider.load_entities(pos).unwrap().len(), 1);
        }
    }
}

/// Writers and readers racing on one position. Every load sees one whole
/// saved chunk, never a mix or a decode failure.
pub fn same_position_contention(provider: Arc<dyn Provider>) {
    let pos = ChunkPos::new(0, 0);
    let blocks = ["minecraft:stone", "minecraft:dirt", "minecraft:sand", "minecraft:gravel"];
    let candidates: Vec<Chunk> = blocks.iter().map(|block| sample_chunk(block)).collect();

    let handles: Vec<_> = blocks
        .iter()
        .map(|block| {
            let provider = Arc::clone(&provider);
            let candidates = candidates.clone();
            let mine = sample_chunk(block);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    provider.save_chunk(pos, &mine).unwrap();
                    let seen = provider.load_chunk(pos).unwrap().unwrap();
                    assert!(candidates.contains(&seen), "load returned a chunk nobody saved");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    let last = provider.load_chunk(pos).unwrap().unwrap();
    assert!(candidates.contains(&last));
}
