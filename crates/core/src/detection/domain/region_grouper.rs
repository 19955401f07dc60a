use crate::shared::region::Region;

/// Clusters raw multi-scale hits and keeps only well-supported clusters.
///
/// Two hits belong together when every edge differs by at most
/// `eps * (min_width + min_height) / 2`; similarity is closed transitively.
/// A cluster survives when it holds more than `min_neighbors` hits and is
/// reported as the rounded mean of its members. Surviving clusters that sit
/// inside a better-supported cluster are dropped. With `min_neighbors == 0`
/// the raw hits are returned untouched.
pub fn group_regions(regions: &[Region], min_neighbors: u32, eps: f64) -> Vec<Region> {
    if min_neighbors == 0 || regions.is_empty() {
        return regions.to_vec();
    }

    let (labels, class_count) = partition(regions, eps);

    let mut sums = vec![[0i64; 4]; class_count];
    let mut counts = vec![0u32; class_count];
    for (r, &label) in regions.iter().zip(&labels) {
        let s = &mut sums[label];
        s[0] += r.x as i64;
        s[1] += r.y as i64;
        s[2] += r.width as i64;
        s[3] += r.height as i64;
        counts[label] += 1;
    }

    let averaged: Vec<Region> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &n)| {
            let mean = |v: i64| (v as f64 / n as f64).round() as i32;
            Region::new(mean(s[0]), mean(s[1]), mean(s[2]), mean(s[3]))
        })
        .collect();

    let mut grouped = Vec::new();
    for (i, r1) in averaged.iter().enumerate() {
        let n1 = counts[i];
        if n1 <= min_neighbors {
            continue;
        }
        let nested = averaged.iter().enumerate().any(|(j, r2)| {
            let n2 = counts[j];
            j != i && n2 > min_neighbors && is_nested(r1, r2, eps) && (n2 > n1.max(3) || n1 < 3)
        });
        if !nested {
            grouped.push(*r1);
        }
    }
    grouped
}

fn is_similar(a: &Region, b: &Region, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    (a.x - b.x).abs() as f64 <= delta
        && (a.y - b.y).abs() as f64 <= delta
        && (a.right() - b.right()).abs() as f64 <= delta
        && (a.bottom() - b.bottom()).abs() as f64 <= delta
}

/// `inner` lies within `outer` grown by `eps` of its size on each side.
fn is_nested(inner: &Region, outer: &Region, eps: f64) -> bool {
    let dx = (outer.width as f64 * eps).round() as i32;
    let dy = (outer.height as f64 * eps).round() as i32;
    inner.x >= outer.x - dx
        && inner.y >= outer.y - dy
        && inner.right() <= outer.right() + dx
        && inner.bottom() <= outer.bottom() + dy
}

/// Labels each region with its equivalence class, numbered in order of
/// first appearance.
fn partition(regions: &[Region], eps: f64) -> (Vec<usize>, usize) {
    let n = regions.len();
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if is_similar(&regions[i], &regions[j], eps) {
                union(&mut parent, i, j);
            }
        }
    }

    let mut root_labels: Vec<Option<usize>> = vec![None; n];
    let mut labels = Vec::with_capacity(n);
    let mut class_count = 0;
    for i in 0..n {
        let root = find(&mut parent, i);
        let label = *root_labels[root].get_or_insert_with(|| {
            class_count += 1;
            class_count - 1
        });
        labels.push(label);
    }
    (labels, class_count)
}

/// Find root of element `i` with path halving.
fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra] = rb;
    }
}
