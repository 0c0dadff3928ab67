//! Per-file block reconstruction.
//!
//! Walks one file's lines in order and turns start / energy-update / end
//! commands into [`Block`]s, keeping at most one block open at a time.

use energy_core::data_processors::LineParser;
use energy_core::models::{Block, Command, LogLine};
use energy_core::Result;
use tracing::debug;

/// Blocks produced from one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOutput {
    /// Blocks closed by an end line, plus blocks orphaned by a repeated start.
    pub blocks: Vec<Block>,
    /// The block still open when the file ended, if any.
    pub trailing: Option<Block>,
}

impl BuildOutput {
    /// All blocks in file order, the trailing block last.
    pub fn into_blocks(self) -> Vec<Block> {
        let mut blocks = self.blocks;
        blocks.extend(self.trailing);
        blocks
    }
}

/// Line-by-line state machine with a single open-block slot.
#[derive(Debug, Default)]
pub struct BlockBuilder {
    blocks: Vec<Block>,
    current: Option<Block>,
    orphaned: usize,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the builder over a whole file.
    pub fn build<S: AsRef<str>>(lines: &[S]) -> Result<BuildOutput> {
        let mut builder = Self::new();
        for line in lines {
            builder.feed(line.as_ref())?;
        }
        Ok(builder.finish())
    }

    /// Consume one raw line.
    ///
    /// Only lines that change state are parsed, so a malformed energy line
    /// outside any block is ignored while one inside a block is an error.
    pub fn feed(&mut self, line: &str) -> Result<()> {
        let acts = match LineParser::classify(line) {
            Command::StartMeasurement => true,
            Command::UpdateEnergyInfo | Command::EndMeasurement => self.current.is_some(),
            Command::Other => false,
        };
        if !acts {
            return Ok(());
        }
        if let Some(parsed) = LineParser::parse(line)? {
            self.apply(&parsed);
        }
        Ok(())
    }

    /// Apply an already-parsed line.
    pub fn apply(&mut self, line: &LogLine) {
        match line.command {
            Command::StartMeasurement => {
                // A block superseded by a new start keeps no end time.
                if let Some(orphan) = self.current.take() {
                    debug!(
                        start = %orphan.start_time,
                        "block superseded by a new start before its end line"
                    );
                    self.orphaned += 1;
                    self.blocks.push(orphan);
                }
                self.current = Some(Block::open(line.timestamp));
            }
            Command::UpdateEnergyInfo => {
                if let (Some(block), Some(sample)) = (self.current.as_mut(), line.energy) {
                    block.add_energy(sample);
                }
            }
            Command::EndMeasurement => {
                if let Some(mut block) = self.current.take() {
                    block.close(line.timestamp);
                    self.blocks.push(block);
                }
            }
            Command::Other => {}
        }
    }

    /// Stop feeding and hand back closed blocks and the trailing open block.
    pub fn finish(self) -> BuildOutput {
        debug!(
            blocks = self.blocks.len(),
            orphaned = self.orphaned,
            trailing = self.current.is_some(),
            "file scanned"
        );
        BuildOutput {
            blocks: self.blocks,
            trailing: self.current,
        }
    }
}
