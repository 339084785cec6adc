/*
 * Copyright 2026 pgsup Contributors
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! Owned raster buffers and the image analysis routines the layout and
//! segmentation stages rely on: alpha-plane handling, Gaussian blur,
//! connected-component labeling and structural similarity.


use crate::geometry::Rect;

/// A single-channel byte plane.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl Plane {

    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, data: vec![0; width * height] }
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self { width, height, data }
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.width + x] = v;
    }

    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    pub fn crop(&self, rect: &Rect) -> Plane {
        let mut out = Plane::new(rect.dx as usize, rect.dy as usize);
        for y in 0..rect.dy as usize {
            for x in 0..rect.dx as usize {
                let v = self.get(rect.x as usize + x, rect.y as usize + y);
                out.set(x, y, v);
            }
        }
        out
    }
}

/// An RGBA raster with straight (non-premultiplied) alpha.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RgbaImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbaImage {

    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, data: vec![0; width * height * 4] }
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width * height * 4);
        Self { width, height, data }
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let o = (y * self.width + x) * 4;
        [self.data[o], self.data[o + 1], self.data[o + 2], self.data[o + 3]]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, px: [u8; 4]) {
        let o = (y * self.width + x) * 4;
        self.data[o..o + 4].copy_from_slice(&px);
    }

    pub fn alpha_at(&self, x: usize, y: usize) -> u8 {
        self.data[(y * self.width + x) * 4 + 3]
    }

    /// The alpha channel as a standalone plane.
    pub fn alpha_plane(&self) -> Plane {
        let data = self.data.chunks_exact(4).map(|px| px[3]).collect();
        Plane::from_raw(self.width, self.height, data)
    }

    /// True when at least one pixel is not fully transparent.
    pub fn has_content(&self) -> bool {
        self.data.chunks_exact(4).any(|px| px[3] != 0)
    }

    /// Tight bounding box of non-transparent pixels, or `None` for a fully
    /// transparent image.
    pub fn alpha_bbox(&self) -> Option<Rect> {
        let mut x1 = self.width;
        let mut y1 = self.height;
        let mut x2 = 0usize;
        let mut y2 = 0usize;
        let mut seen = false;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.alpha_at(x, y) != 0 {
                    seen = true;
                    x1 = x1.min(x);
                    y1 = y1.min(y);
                    x2 = x2.max(x + 1);
                    y2 = y2.max(y + 1);
                }
            }
        }
        seen.then(|| Rect::new(x1 as i32, y1 as i32, (x2 - x1) as i32, (y2 - y1) as i32))
    }

    /// Composites `src` over `self` (Porter-Duff source-over, straight alpha).
    pub fn alpha_composite(&mut self, src: &RgbaImage) {
        debug_assert!(self.width == src.width && self.height == src.height);
        for (dst_px, src_px) in
            self.data.chunks_exact_mut(4).zip(src.data.chunks_exact(4))
        {
            let sa = src_px[3] as u32;
            if sa == 255 {
                dst_px.copy_from_slice(src_px);
                continue;
            }
            if sa == 0 {
                continue;
            }
            let da = dst_px[3] as u32;
            let oa = sa * 255 + da * (255 - sa);
            for c in 0..3 {
                let sc = src_px[c] as u32;
                let dc = dst_px[c] as u32;
                let num = sc * sa * 255 + dc * da * (255 - sa);
                dst_px[c] = ((num + oa / 2) / oa) as u8;
            }
            dst_px[3] = ((oa + 127) / 255) as u8;
        }
    }

    /// Rec. 601 luma, gated by alpha presence: transparent pixels read as 0.
    pub fn grayscale(&self) -> Plane {
        let data = self
            .data
            .chunks_exact(4)
            .map(|px| {
                if px[3] == 0 {
                    return 0;
                }
                let y = 0.2989 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64;
                y.round().clamp(0.0, 255.0) as u8
            })
            .collect();
        Plane::from_raw(self.width, self.height, data)
    }

    pub fn crop(&self, rect: &Rect) -> RgbaImage {
        let mut out = RgbaImage::new(rect.dx as usize, rect.dy as usize);
        for y in 0..rect.dy as usize {
            for x in 0..rect.dx as usize {
                let px = self.pixel(rect.x as usize + x, rect.y as usize + y);
                out.set_pixel(x, y, px);
            }
        }
        out
    }

    /// Copies `src` wholesale into `self` with its top-left corner at (x, y).
    pub fn blit(&mut self, src: &RgbaImage, x: usize, y: usize) {
        debug_assert!(x + src.width <= self.width && y + src.height <= self.height);
        for sy in 0..src.height {
            let so = sy * src.width * 4;
            let dof = ((y + sy) * self.width + x) * 4;
            self.data[dof..dof + src.width * 4]
                .copy_from_slice(&src.data[so..so + src.width * 4]);
        }
    }
}

/// Separable Gaussian blur of a byte plane, normalized to `[0, 1]`. Kernel
/// radius is `ceil(4 sigma)`; edges clamp to the nearest sample.
pub fn gaussian_blur(plane: &Plane, sigma_y: f64, sigma_x: f64) -> Vec<f64> {

    fn kernel(sigma: f64) -> Vec<f64> {
        if sigma <= 0.0 {
            return vec![1.0];
        }
        let radius = (4.0 * sigma).ceil() as i64;
        let mut k: Vec<f64> = (-radius..=radius)
            .map(|i| (-(i as f64).powi(2) / (2.0 * sigma * sigma)).exp())
            .collect();
        let sum: f64 = k.iter().sum();
        for v in k.iter_mut() {
            *v /= sum;
        }
        k
    }

    let (w, h) = (plane.width, plane.height);
    let mut tmp = vec![0.0f64; w * h];
    let mut out = vec![0.0f64; w * h];

    let kx = kernel(sigma_x);
    let rx = (kx.len() / 2) as i64;
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (i, kv) in kx.iter().enumerate() {
                let sx = (x as i64 + i as i64 - rx).clamp(0, w as i64 - 1) as usize;
                acc += kv * plane.get(sx, y) as f64 / 255.0;
            }
            tmp[y * w + x] = acc;
        }
    }

    let ky = kernel(sigma_y);
    let ry = (ky.len() / 2) as i64;
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (i, kv) in ky.iter().enumerate() {
                let sy = (y as i64 + i as i64 - ry).clamp(0, h as i64 - 1) as usize;
                acc += kv * tmp[sy * w + x];
            }
            out[y * w + x] = acc;
        }
    }
    out
}

struct DisjointSet {
    parent: Vec<u32>,
}

impl DisjointSet {

    fn new() -> Self {
        Self { parent: Vec::new() }
    }

    fn make(&mut self) -> u32 {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        id
    }

    fn find(&mut self, mut id: u32) -> u32 {
        while self.parent[id as usize] != id {
            let gp = self.parent[self.parent[id as usize] as usize];
            self.parent[id as usize] = gp;
            id = gp;
        }
        id
    }

    fn union(&mut self, a: u32, b: u32) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra.max(rb) as usize] = ra.min(rb);
        }
    }
}

/// A binary volume over (time, y, x).
#[derive(Clone, Debug)]
pub struct Volume {
    pub depth: usize,
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl Volume {

    pub fn new(depth: usize, width: usize, height: usize) -> Self {
        Self { depth, width, height, data: vec![0; depth * width * height] }
    }

    pub fn get(&self, t: usize, x: usize, y: usize) -> u8 {
        self.data[(t * self.height + y) * self.width + x]
    }

    pub fn set(&mut self, t: usize, x: usize, y: usize, v: u8) {
        self.data[(t * self.height + y) * self.width + x] = v;
    }
}

/// A 3-D connected component: temporal and spatial bounds plus the per-frame
/// membership mask cropped to the spatial bounds.
#[derive(Clone, Debug)]
pub struct Component3 {
    pub label: usize,
    pub t0: usize,
    pub t1: usize,
    pub rect: Rect,
    pub frames: Vec<Plane>,
}

/// Labels the 26-connected components of a binary volume and extracts their
/// bounds and masks. Components come out ordered by first occurrence in
/// (t, y, x) scan order.
pub fn label_volume(vol: &Volume) -> Vec<Component3> {

    let (d, w, h) = (vol.depth, vol.width, vol.height);
    let mut labels = vec![0u32; d * w * h];
    let mut ds = DisjointSet::new();
    ds.make(); // background

    let idx = |t: usize, x: usize, y: usize| (t * h + y) * w + x;

    for t in 0..d {
        for y in 0..h {
            for x in 0..w {
                if vol.get(t, x, y) == 0 {
                    continue;
                }
                let mut lbl = 0u32;
                // Half-neighborhood already scanned: previous frame (full 3x3)
                // plus the 4 preceding spatial neighbors of this frame.
                let consider = |labels: &[u32], ds: &mut DisjointSet,
                                    t2: i64, x2: i64, y2: i64, lbl: &mut u32| {
                    if t2 < 0 || x2 < 0 || y2 < 0
                        || t2 >= d as i64 || x2 >= w as i64 || y2 >= h as i64
                    {
                        return;
                    }
                    let n = labels[idx(t2 as usize, x2 as usize, y2 as usize)];
                    if n != 0 {
                        if *lbl == 0 {
                            *lbl = n;
                        } else {
                            ds.union(*lbl, n);
                        }
                    }
                };
                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        consider(&labels, &mut ds, t as i64 - 1,
                                 x as i64 + dx, y as i64 + dy, &mut lbl);
                    }
                }
                consider(&labels, &mut ds, t as i64, x as i64 - 1, y as i64 - 1, &mut lbl);
                consider(&labels, &mut ds, t as i64, x as i64, y as i64 - 1, &mut lbl);
                consider(&labels, &mut ds, t as i64, x as i64 + 1, y as i64 - 1, &mut lbl);
                consider(&labels, &mut ds, t as i64, x as i64 - 1, y as i64, &mut lbl);

                if lbl == 0 {
                    lbl = ds.make();
                }
                labels[idx(t, x, y)] = lbl;
            }
        }
    }

    // Resolve equivalences and collect bounds in scan order.
    let mut order: Vec<u32> = Vec::new();
    let mut bounds: Vec<(usize, usize, usize, usize, usize, usize)> = Vec::new();
    let mut remap = vec![u32::MAX; ds.parent.len()];
    for t in 0..d {
        for y in 0..h {
            for x in 0..w {
                let lbl = labels[idx(t, x, y)];
                if lbl == 0 {
                    continue;
                }
                let root = ds.find(lbl);
                let slot = if remap[root as usize] == u32::MAX {
                    remap[root as usize] = order.len() as u32;
                    order.push(root);
                    bounds.push((t, t + 1, x, x + 1, y, y + 1));
                    (order.len() - 1) as u32
                } else {
                    remap[root as usize]
                };
                labels[idx(t, x, y)] = slot + 1;
                let b = &mut bounds[slot as usize];
                b.0 = b.0.min(t);
                b.1 = b.1.max(t + 1);
                b.2 = b.2.min(x);
                b.3 = b.3.max(x + 1);
                b.4 = b.4.min(y);
                b.5 = b.5.max(y + 1);
            }
        }
    }

    bounds
        .iter()
        .enumerate()
        .map(|(slot, &(t0, t1, x0, x1, y0, y1))| {
            let rect =
                Rect::new(x0 as i32, y0 as i32, (x1 - x0) as i32, (y1 - y0) as i32);
            let mut frames = Vec::with_capacity(t1 - t0);
            for t in t0..t1 {
                let mut plane = Plane::new(x1 - x0, y1 - y0);
                for y in y0..y1 {
                    for x in x0..x1 {
                        if labels[idx(t, x, y)] == slot as u32 + 1 {
                            plane.set(x - x0, y - y0, 1);
                        }
                    }
                }
                frames.push(plane);
            }
            Component3 { label: slot, t0, t1, rect, frames }
        })
        .collect()
}

/// A 2-D connected component over an 8-connected binary plane.
#[derive(Clone, Debug)]
pub struct Component2 {
    pub label: usize,
    pub rect: Rect,
}

/// Labels the 8-connected components of a binary plane. Returns the label
/// plane (0 = background, components numbered from 1 in scan order) and the
/// component bounds.
pub fn label_plane(plane: &Plane) -> (Vec<u32>, Vec<Component2>) {

    let (w, h) = (plane.width, plane.height);
    let mut labels = vec![0u32; w * h];
    let mut ds = DisjointSet::new();
    ds.make();

    for y in 0..h {
        for x in 0..w {
            if plane.get(x, y) == 0 {
                continue;
            }
            let mut lbl = 0u32;
            let neighbors: [(i64, i64); 4] = [
                (x as i64 - 1, y as i64 - 1),
                (x as i64, y as i64 - 1),
                (x as i64 + 1, y as i64 - 1),
                (x as i64 - 1, y as i64),
            ];
            for (nx, ny) in neighbors {
                if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                    continue;
                }
                let n = labels[ny as usize * w + nx as usize];
                if n != 0 {
                    if lbl == 0 {
                        lbl = n;
                    } else {
                        ds.union(lbl, n);
                    }
                }
            }
            if lbl == 0 {
                lbl = ds.make();
            }
            labels[y * w + x] = lbl;
        }
    }

    let mut remap = vec![u32::MAX; ds.parent.len()];
    let mut comps: Vec<Component2> = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let lbl = labels[y * w + x];
            if lbl == 0 {
                continue;
            }
            let root = ds.find(lbl);
            let slot = if remap[root as usize] == u32::MAX {
                remap[root as usize] = comps.len() as u32;
                comps.push(Component2 {
                    label: comps.len(),
                    rect: Rect::new(x as i32, y as i32, 1, 1),
                });
                (comps.len() - 1) as u32
            } else {
                remap[root as usize]
            };
            labels[y * w + x] = slot + 1;
            let r = &mut comps[slot as usize].rect;
            *r = r.union(&Rect::new(x as i32, y as i32, 1, 1));
        }
    }
    (labels, comps)
}

const SSIM_C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const SSIM_C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);
const SSIM_TILE: usize = 8;

/// Mean structural similarity over 8x8 tiles of two equally sized grayscale
/// planes. Returns 1.0 for identical inputs.
pub fn ssim(a: &Plane, b: &Plane) -> f64 {

    debug_assert!(a.width == b.width && a.height == b.height);
    if a.width == 0 || a.height == 0 {
        return 1.0;
    }

    let mut total = 0.0;
    let mut tiles = 0usize;
    let mut ty = 0;
    while ty < a.height {
        let th = SSIM_TILE.min(a.height - ty);
        let mut tx = 0;
        while tx < a.width {
            let tw = SSIM_TILE.min(a.width - tx);
            let n = (tw * th) as f64;

            let mut sum_a = 0.0;
            let mut sum_b = 0.0;
            for y in ty..ty + th {
                for x in tx..tx + tw {
                    sum_a += a.get(x, y) as f64;
                    sum_b += b.get(x, y) as f64;
                }
            }
            let mu_a = sum_a / n;
            let mu_b = sum_b / n;

            let mut var_a = 0.0;
            let mut var_b = 0.0;
            let mut cov = 0.0;
            for y in ty..ty + th {
                for x in tx..tx + tw {
                    let da = a.get(x, y) as f64 - mu_a;
                    let db = b.get(x, y) as f64 - mu_b;
                    var_a += da * da;
                    var_b += db * db;
                    cov += da * db;
                }
            }
            var_a /= n;
            var_b /= n;
            cov /= n;

            total += ((2.0 * mu_a * mu_b + SSIM_C1) * (2.0 * cov + SSIM_C2))
                / ((mu_a * mu_a + mu_b * mu_b + SSIM_C1) * (var_a + var_b + SSIM_C2));
            tiles += 1;
            tx += SSIM_TILE;
        }
        ty += SSIM_TILE;
    }
    total / tiles as f64
}
