//! Colour reduction: exact histogram, median cut, k-means refinement

use std::collections::HashMap;

/// An RGB triple
pub type Rgb = [u8; 3];

/// Bits kept per channel when the histogram has to be coarsened
const HISTOGRAM_BITS: u32 = 5;
const HISTOGRAM_BINS: usize = 1 << (3 * HISTOGRAM_BITS);

/// Ordered set of distinct colours, at most 256 long when built by
/// [`Palette::build`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    /// Palette from explicit colours; duplicates are dropped, order kept
    pub fn from_colors(colors: impl IntoIterator<Item = Rgb>) -> Self {
        let mut unique: Vec<Rgb> = Vec::new();
        for color in colors {
            if !unique.contains(&color) {
                unique.push(color);
            }
        }
        Self { colors: unique }
    }

    /// Reduce packed RGB pixels to at most `max_colors` colours.
    ///
    /// Inputs with few distinct colours get exactly those colours back, so a
    /// uniform image yields a one-entry palette. Otherwise median cut seeds
    /// the palette and `iterations` rounds of k-means refine it.
    pub fn build(rgb: &[u8], max_colors: usize, iterations: usize) -> Self {
        let max_colors = max_colors.clamp(1, 256);
        let histogram = Histogram::from_pixels(rgb, max_colors);

        if let Some(exact) = histogram.exact_colors() {
            return Self::from_colors(exact);
        }

        let mut entries = histogram.coarse_entries();
        let seeds = median_cut(&mut entries, max_colors);
        let refined = kmeans(&entries, seeds, iterations);
        Self::from_colors(refined)
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Index of the closest colour by squared RGB distance
    pub fn nearest(&self, color: Rgb) -> u8 {
        let mut best = 0usize;
        let mut best_distance = u32::MAX;
        for (i, candidate) in self.colors.iter().enumerate() {
            let d = distance(*candidate, color);
            if d < best_distance {
                best = i;
                best_distance = d;
                if d == 0 {
                    break;
                }
            }
        }
        best as u8
    }

    /// Flat `r, g, b, r, g, b, ...` table as GIF colour tables store it
    pub fn to_table(&self) -> Vec<u8> {
        self.colors.iter().flatten().copied().collect()
    }
}

fn distance(a: Rgb, b: Rgb) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = i32::from(x) - i32::from(y);
            (d * d) as u32
        })
        .sum()
}

/// A (possibly averaged) colour and how many pixels it stands for
#[derive(Debug, Clone, Copy)]
struct Entry {
    color: Rgb,
    count: u64,
}

struct Histogram {
    /// Exact counts while the number of distinct colours stays small
    exact: Option<HashMap<Rgb, u64>>,
    counts: Vec<u64>,
    sums: Vec<[u64; 3]>,
}

impl Histogram {
    fn from_pixels(rgb: &[u8], exact_limit: usize) -> Self {
        let mut exact = Some(HashMap::new());
        let mut counts = vec![0u64; HISTOGRAM_BINS];
        let mut sums = vec![[0u64; 3]; HISTOGRAM_BINS];

        for px in rgb.chunks_exact(3) {
            let color = [px[0], px[1], px[2]];

            if let Some(map) = exact.as_mut() {
                *map.entry(color).or_insert(0) += 1;
                if map.len() > exact_limit {
                    exact = None;
                }
            }

            let bin = bin_index(color);
            counts[bin] += 1;
            for (sum, &c) in sums[bin].iter_mut().zip(color.iter()) {
                *sum += u64::from(c);
            }
        }

        Self {
            exact,
            counts,
            sums,
        }
    }

    /// Distinct colours, most frequent first, if they all fit
    fn exact_colors(&self) -> Option<Vec<Rgb>> {
        let map = self.exact.as_ref()?;
        let mut colors: Vec<(Rgb, u64)> = map.iter().map(|(c, n)| (*c, *n)).collect();
        colors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Some(colors.into_iter().map(|(c, _)| c).collect())
    }

    fn coarse_entries(&self) -> Vec<Entry> {
        self.counts
            .iter()
            .zip(self.sums.iter())
            .filter(|(count, _)| **count > 0)
            .map(|(&count, sum)| Entry {
                color: [
                    ((sum[0] + count / 2) / count) as u8,
                    ((sum[1] + count / 2) / count) as u8,
                    ((sum[2] + count / 2) / count) as u8,
                ],
                count,
            })
            .collect()
    }
}

fn bin_index(color: Rgb) -> usize {
    let shift = 8 - HISTOGRAM_BITS;
    let r = usize::from(color[0] >> shift);
    let g = usize::from(color[1] >> shift);
    let b = usize::from(color[2] >> shift);
    (r << (2 * HISTOGRAM_BITS)) | (g << HISTOGRAM_BITS) | b
}

/// Contiguous run of entries forming one box
#[derive(Debug, Clone, Copy)]
struct ColorBox {
    start: usize,
    end: usize,
}

impl ColorBox {
    fn widest_channel(&self, entries: &[Entry]) -> (usize, u8) {
        let slice = &entries[self.start..self.end];
        (0..3)
            .map(|ch| {
                let (lo, hi) = slice.iter().fold((u8::MAX, u8::MIN), |(lo, hi), e| {
                    (lo.min(e.color[ch]), hi.max(e.color[ch]))
                });
                (ch, hi.saturating_sub(lo))
            })
            .max_by_key(|&(_, range)| range)
            .unwrap_or((0, 0))
    }

    fn population(&self, entries: &[Entry]) -> u64 {
        entries[self.start..self.end].iter().map(|e| e.count).sum()
    }

    fn can_split(&self) -> bool {
        self.end - self.start >= 2
    }

    fn score(&self, entries: &[Entry]) -> u64 {
        if !self.can_split() {
            return 0;
        }
        let (_, range) = self.widest_channel(entries);
        u64::from(range) * self.population(entries)
    }

    fn mean(&self, entries: &[Entry]) -> Rgb {
        let slice = &entries[self.start..self.end];
        let total: u64 = slice.iter().map(|e| e.count).sum::<u64>().max(1);
        let mut out = [0u8; 3];
        for (ch, value) in out.iter_mut().enumerate() {
            let sum: u64 = slice.iter().map(|e| u64::from(e.color[ch]) * e.count).sum();
            *value = ((sum + total / 2) / total) as u8;
        }
        out
    }
}

/// Split boxes until there are `max_colors` of them or none can be split
fn median_cut(entries: &mut [Entry], max_colors: usize) -> Vec<Rgb> {
    let mut boxes = vec![ColorBox {
        start: 0,
        end: entries.len(),
    }];

    while boxes.len() < max_colors {
        let Some((index, score)) = boxes
            .iter()
            .enumerate()
            .map(|(i, b)| (i, b.score(entries)))
            .max_by_key(|&(_, score)| score)
        else {
            break;
        };
        if score == 0 {
            break;
        }

        let target = boxes[index];
        let (channel, _) = target.widest_channel(entries);
        let slice = &mut entries[target.start..target.end];
        slice.sort_unstable_by_key(|e| e.color[channel]);

        // Weighted median, keeping both halves non-empty
        let half = target.population(entries) / 2;
        let mut running = 0u64;
        let mut split = target.start + 1;
        for (offset, entry) in entries[target.start..target.end].iter().enumerate() {
            running += entry.count;
            if running >= half {
                split = target.start + offset + 1;
                break;
            }
        }
        let split = split.clamp(target.start + 1, target.end - 1);

        boxes[index] = ColorBox {
            start: target.start,
            end: split,
        };
        boxes.push(ColorBox {
            start: split,
            end: target.end,
        });
    }

    boxes.iter().map(|b| b.mean(entries)).collect()
}

/// Lloyd iterations over the weighted histogram entries
fn kmeans(entries: &[Entry], seeds: Vec<Rgb>, iterations: usize) -> Vec<Rgb> {
    let mut centroids = seeds;
    if centroids.is_empty() {
        return centroids;
    }

    for _ in 0..iterations {
        let mut sums = vec![[0u64; 3]; centroids.len()];
        let mut counts = vec![0u64; centroids.len()];

        for entry in entries {
            let nearest = centroids
                .iter()
                .enumerate()
                .min_by_key(|(_, c)| distance(**c, entry.color))
                .map(|(i, _)| i)
                .unwrap_or(0);
            counts[nearest] += entry.count;
            for (sum, &c) in sums[nearest].iter_mut().zip(entry.color.iter()) {
                *sum += u64::from(c) * entry.count;
            }
        }

        let mut moved = false;
        for ((centroid, sum), &count) in centroids.iter_mut().zip(sums.iter()).zip(counts.iter()) {
            // Empty clusters keep their seed
            if count == 0 {
                continue;
            }
            let next = [
                ((sum[0] + count / 2) / count) as u8,
                ((sum[1] + count / 2) / count) as u8,
                ((sum[2] + count / 2) / count) as u8,
            ];
            if next != *centroid {
                *centroid = next;
                moved = true;
            }
        }

        if !moved {
            break;
        }
    }

    centroids
}
