//! Train a small classifier on synthetic clusters, checkpoint it, restore
//! it, and confirm the restored model scores identically.
//!
//! Run with: cargo run --example train_and_checkpoint

use galvani::{
    Checkpoint, CrossEntropy, Dataset, Network, NetworkSpec, SGD, TrainConfig, Trainer,
    TrainingMeta, evaluate,
};
use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

fn gaussian_clusters(centers: &[(f32, f32)], n_per_class: usize, std: f32, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, std).unwrap();
    let n = centers.len() * n_per_class;
    let mut rows = Vec::with_capacity(n * 2);
    let mut labels = Vec::with_capacity(n);
    for (class, &(cx, cy)) in centers.iter().enumerate() {
        for _ in 0..n_per_class {
            rows.push(cx + noise.sample(&mut rng));
            rows.push(cy + noise.sample(&mut rng));
            labels.push(class);
        }
    }
    Dataset::new(Array2::from_shape_vec((n, 2), rows).unwrap(), labels).unwrap()
}

fn main() -> galvani::Result<()> {
    let centers = [(0.0, 0.0), (5.0, 0.0), (0.0, 5.0)];
    let train = gaussian_clusters(&centers, 100, 0.7, 1);
    let eval = gaussian_clusters(&centers, 30, 0.7, 2);

    let mut rng = StdRng::seed_from_u64(42);
    let spec = NetworkSpec::new(2, 3, vec![32, 16]);
    let mut model = Network::with_rng(spec, 0.1, &mut rng)?;
    println!(
        "built a {:?} network with {} parameters",
        model.spec().hidden_layers,
        model.num_params()
    );

    let optimizer = SGD::new(&model, 0.1, 0.9, 1e-4);
    let config = TrainConfig {
        epochs: 20,
        batch_size: 16,
        log_every: 0,
        eval_every: 5,
        shuffle: true,
        seed: Some(7),
        progress: true,
    };
    let mut trainer = Trainer::new(CrossEntropy, optimizer, config);
    let history = trainer.fit(&mut model, &train, Some(&eval));

    let path = std::env::temp_dir().join("galvani_demo.bin");
    Checkpoint::capture(&model)
        .with_meta(TrainingMeta {
            epochs: history.epoch_loss.len(),
            loss_history: history.epoch_loss.clone(),
        })
        .save(&path)?;
    println!("checkpoint written to {}", path.display());

    let mut restored = Checkpoint::load(&path)?.restore()?;
    let original = evaluate(&mut model, &eval, &CrossEntropy, 32);
    let roundtrip = evaluate(&mut restored, &eval, &CrossEntropy, 32);
    println!(
        "restored model: eval loss = {:.6} (original {:.6}), accuracy = {:.3}",
        roundtrip.loss, original.loss, roundtrip.accuracy
    );
    assert_eq!(original.loss, roundtrip.loss);

    let _ = std::fs::remove_file(&path);
    Ok(())
}
