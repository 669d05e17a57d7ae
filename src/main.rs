//! Election stress demo: streams votes through the engine in batches,
//! recording per-batch throughput and store occupancy to a CSV.

use std::error::Error;
use std::sync::Arc;
use std::time::Instant;

use csv::Writer;
use hetally::engine::{check_integrity, STREAMING_BATCH_SIZE};
use hetally::{create_vote_vector, CipherStore, SchemeContext, SchemeParameters, TallyEngine};

fn main() -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_path("tally_stats.csv")?;
    wtr.write_record(["batch", "votes_total", "time_ms", "store_entries"])?;

    let total_votes = 500usize;
    let candidates = 3usize;

    println!("Setting up BFV context (t = 65537, depth 1)...");
    let setup = Instant::now();
    let ctx = Arc::new(SchemeContext::setup(SchemeParameters::default())?);
    println!("Context ready in {:?}", setup.elapsed());

    // A deliberately small store: the point of the demo is that the
    // streaming path stays correct while memory stays bounded.
    let mut engine = TallyEngine::with_store(ctx, CipherStore::with_capacity(100));

    println!("Casting {total_votes} votes across {candidates} candidates...");
    let run = Instant::now();
    let mut tally = engine.create_zero_tally(candidates)?;
    let mut processed = 0usize;

    for batch in 0..total_votes.div_ceil(STREAMING_BATCH_SIZE) {
        let batch_start = Instant::now();
        let upper = ((batch + 1) * STREAMING_BATCH_SIZE).min(total_votes);

        while processed < upper {
            let vote = create_vote_vector(processed % candidates, candidates)?;
            let vote_id = engine.encrypt_vote(&vote)?;
            tally = engine.add_to_tally(tally, vote_id)?;
            processed += 1;
        }
        engine.store_mut().compact_to_half();

        wtr.write_record([
            batch.to_string(),
            processed.to_string(),
            batch_start.elapsed().as_millis().to_string(),
            engine.store().len().to_string(),
        ])?;
        println!(
            "  batch {batch}: {processed} votes, store at {} entries",
            engine.store().len()
        );
    }
    wtr.flush()?;

    let counts = engine.decrypt_tally(tally, candidates)?;
    let elapsed = run.elapsed();

    println!("\nDecrypted tally:");
    for (candidate, count) in counts.iter().enumerate() {
        println!("  candidate {candidate}: {count} vote(s)");
    }
    println!(
        "{} votes in {:.2?} ({:.0} votes/s), stats in tally_stats.csv",
        total_votes,
        elapsed,
        total_votes as f64 / elapsed.as_secs_f64()
    );

    check_integrity(&counts, total_votes as u64)?;
    println!("Integrity check passed.");
    Ok(())
}
