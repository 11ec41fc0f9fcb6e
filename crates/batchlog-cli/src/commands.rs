use anyhow::{Context, bail};
use batchlog::{BatchIndex, SequenceLog};
use bytes::Bytes;
use tracing::info;

pub async fn append<L: SequenceLog>(
    index: &BatchIndex<L>,
    blocks: Vec<String>,
) -> anyhow::Result<()> {
    let blocks = blocks.into_iter().map(Bytes::from).collect();
    let batch = index.append(blocks).await.context("append failed")?;
    println!("{batch}");
    Ok(())
}

pub async fn get<L: SequenceLog>(
    index: &BatchIndex<L>,
    batch_index: u64,
    position: Option<u64>,
    as_hex: bool,
) -> anyhow::Result<()> {
    let batch = index
        .get(batch_index)
        .await
        .with_context(|| format!("looking up batch {batch_index}"))?;

    let blocks = match position {
        Some(position) => vec![batch.get(position).await?],
        None => batch.blocks().await?,
    };
    for block in blocks {
        println!("{}", render(&block, as_hex));
    }
    Ok(())
}

pub async fn info<L: SequenceLog>(index: &BatchIndex<L>) -> anyhow::Result<()> {
    let entries = index.log().current_length().await?;
    match index.head().await? {
        Some(head) => {
            println!("batches:       {}", head.index() + 1);
            println!("bytes:         {}", head.byte_length());
            println!("entries:       {entries}");
            println!("head sequence: {}", head.sequence());
            println!("head length:   {}", head.length());
        }
        None => println!("empty log"),
    }
    Ok(())
}

/// Look up every batch from the head and check each one's index, position,
/// and cumulative byte length against its neighbor
pub async fn verify<L: SequenceLog>(index: &BatchIndex<L>) -> anyhow::Result<()> {
    let length = index.length().await?;
    let mut bytes_before = 0u64;
    let mut next_sequence = 0u64;

    for batch_index in 0..length {
        let batch = index.get(batch_index).await?;
        if batch.index() != batch_index {
            bail!("lookup of batch {batch_index} returned batch {}", batch.index());
        }
        if batch.first_sequence() != next_sequence {
            bail!(
                "batch {batch_index} starts at sequence {}, expected {next_sequence}",
                batch.first_sequence()
            );
        }

        let blocks = batch.blocks().await?;
        let batch_bytes: u64 = blocks.iter().map(|b| b.len() as u64).sum();
        if bytes_before + batch_bytes != batch.byte_length() {
            bail!(
                "batch {batch_index} reports {} cumulative bytes, blocks add up to {}",
                batch.byte_length(),
                bytes_before + batch_bytes
            );
        }

        bytes_before = batch.byte_length();
        next_sequence = batch.sequence() + 1;
    }

    info!(batches = length, bytes = bytes_before, "Verified log");
    println!("ok: {length} batches, {bytes_before} bytes");
    Ok(())
}

fn render(block: &[u8], as_hex: bool) -> String {
    if as_hex {
        hex::encode(block)
    } else {
        String::from_utf8_lossy(block).into_owned()
    }
}
