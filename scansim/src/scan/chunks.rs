//! Partitioning of the mission into contiguous sample ranges

use crate::scan::schedule::RotationSchedule;
use crate::scan::ScanError;
use std::ops::Range;

/// Half-open range of global sample indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Split `nsamp` samples into chunks of `chunksize`; the last may be shorter.
pub fn partition_mission(nsamp: usize, chunksize: usize) -> Result<Vec<Chunk>, ScanError> {
    if chunksize == 0 {
        return Err(ScanError::ZeroChunkSize);
    }
    let chunksize = chunksize.min(nsamp.max(1));
    Ok((0..nsamp)
        .step_by(chunksize)
        .map(|start| Chunk::new(start, (start + chunksize).min(nsamp)))
        .collect())
}

/// Split a chunk wherever the instrument rotation changes angle.
pub fn subpart_chunk(chunk: &Chunk, rotation: &RotationSchedule, fsamp: f64) -> Vec<Chunk> {
    if rotation.period.is_none() || chunk.is_empty() {
        return vec![*chunk];
    }
    let mut parts = Vec::new();
    let mut start = chunk.start;
    let mut step = rotation.step_of(start, fsamp);
    for sample in chunk.start + 1..chunk.end {
        let next = rotation.step_of(sample, fsamp);
        if next != step {
            parts.push(Chunk::new(start, sample));
            start = sample;
            step = next;
        }
    }
    parts.push(Chunk::new(start, chunk.end));
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_even_and_ragged() {
        let chunks = partition_mission(10, 4).unwrap();
        assert_eq!(
            chunks,
            vec![Chunk::new(0, 4), Chunk::new(4, 8), Chunk::new(8, 10)]
        );
        assert_eq!(partition_mission(8, 4).unwrap().len(), 2);
    }

    #[test]
    fn test_partition_single_chunk() {
        assert_eq!(partition_mission(10, 100).unwrap(), vec![Chunk::new(0, 10)]);
        assert_eq!(partition_mission(10, 10).unwrap(), vec![Chunk::new(0, 10)]);
        assert!(partition_mission(0, 5).unwrap().is_empty());
    }

    #[test]
    fn test_partition_zero_chunksize() {
        assert!(matches!(
            partition_mission(10, 0),
            Err(ScanError::ZeroChunkSize)
        ));
    }

    #[test]
    fn test_partition_covers_every_sample_once() {
        let chunks = partition_mission(1_003, 97).unwrap();
        let total: usize = chunks.iter().map(Chunk::len).sum();
        assert_eq!(total, 1_003);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_subpart_at_rotation_boundaries() {
        // 2.5 samples per step: steps start at 0, 3, 5, 8, 10
        let rot = RotationSchedule::periodic(0.25, 0.0);
        let parts = subpart_chunk(&Chunk::new(1, 9), &rot, 10.0);
        assert_eq!(
            parts,
            vec![Chunk::new(1, 3), Chunk::new(3, 5), Chunk::new(5, 8), Chunk::new(8, 9)]
        );
        for part in &parts {
            let angle = rot.angle_at(part.start, 10.0);
            assert!(part.range().all(|i| rot.angle_at(i, 10.0) == angle));
        }
    }

    #[test]
    fn test_subpart_without_rotation() {
        let chunk = Chunk::new(0, 100);
        assert_eq!(
            subpart_chunk(&chunk, &RotationSchedule::fixed(0.0), 10.0),
            vec![chunk]
        );
    }
}
