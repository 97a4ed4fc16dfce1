//! L×L square lattice with open boundaries.
//!
//! Site index convention: `site = iy · L + ix`, so `ix = site % L` runs fastest.
//! Bonds are enumerated once each by pairing every site with its right and up
//! neighbour, giving 2·L·(L−1) bonds in total (≤ 2N).

use crate::error::{Error, Result};
use crate::tolerances::MAX_SITES;

/// A nearest-neighbour pair `(a, b)` with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub a: usize,
    pub b: usize,
}

impl Bond {
    pub fn touches(&self, site: usize) -> bool {
        self.a == site || self.b == site
    }

    /// The endpoint opposite `site`, if `site` is on this bond.
    pub fn other(&self, site: usize) -> Option<usize> {
        if self.a == site {
            Some(self.b)
        } else if self.b == site {
            Some(self.a)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lattice {
    l: usize,
    bonds: Vec<Bond>,
}

impl Lattice {
    pub fn new(l: usize) -> Result<Self> {
        let n = match l.checked_mul(l) {
            Some(n) if l > 0 && n <= MAX_SITES => n,
            _ => return Err(Error::InvalidLatticeSize { l }),
        };
        let mut bonds = Vec::with_capacity(2 * n);
        for site in 0..n {
            let (ix, iy) = (site % l, site / l);
            if ix + 1 < l {
                bonds.push(Bond { a: site, b: site + 1 });
            }
            if iy + 1 < l {
                bonds.push(Bond { a: site, b: site + l });
            }
        }
        Ok(Self { l, bonds })
    }

    /// Linear size L.
    pub fn side(&self) -> usize {
        self.l
    }

    /// N = L².
    pub fn n_sites(&self) -> usize {
        self.l * self.l
    }

    /// Hilbert-space dimension 2^N.
    pub fn hilbert_dim(&self) -> usize {
        1usize << self.n_sites()
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn check_site(&self, site: usize) -> Result<()> {
        if site >= self.n_sites() {
            return Err(Error::SiteOutOfRange {
                site,
                n_sites: self.n_sites(),
            });
        }
        Ok(())
    }

    pub fn coords(&self, site: usize) -> (usize, usize) {
        (site % self.l, site / self.l)
    }

    /// All grid neighbours of `site` in left, right, down, up order.
    pub fn neighbors(&self, site: usize) -> Result<Vec<usize>> {
        self.check_site(site)?;
        let (ix, iy) = self.coords(site);
        let mut out = Vec::with_capacity(4);
        if ix > 0 {
            out.push(site - 1);
        }
        if ix + 1 < self.l {
            out.push(site + 1);
        }
        if iy > 0 {
            out.push(site - self.l);
        }
        if iy + 1 < self.l {
            out.push(site + self.l);
        }
        Ok(out)
    }

    /// Bonds with `site` as one endpoint, in bond-list order.
    pub fn incident_bonds(&self, site: usize) -> Result<Vec<Bond>> {
        self.check_site(site)?;
        Ok(self.bonds.iter().copied().filter(|b| b.touches(site)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_rejects_zero_size() {
        assert!(matches!(Lattice::new(0), Err(Error::InvalidLatticeSize { l: 0 })));
    }

    /// 2^N must stay addressable and allocatable: L=5 and beyond are refused
    /// instead of overflowing the basis-index shift.
    #[test]
    fn lattice_rejects_sizes_beyond_site_limit() {
        let largest = Lattice::new(4).unwrap();
        assert_eq!(largest.n_sites(), MAX_SITES);
        assert_eq!(largest.hilbert_dim(), 1 << 16);
        for l in [5usize, 8, 64, usize::MAX] {
            let err = Lattice::new(l).unwrap_err();
            assert!(matches!(err, Error::InvalidLatticeSize { .. }), "L={l}: {err}");
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn lattice_bond_count_is_open_boundary() {
        for l in 1..=4 {
            let lat = Lattice::new(l).unwrap();
            let expected = 2 * l * (l - 1);
            assert_eq!(lat.bonds().len(), expected, "L={l}: bond count");
            assert!(lat.bonds().len() <= 2 * lat.n_sites());
            for b in lat.bonds() {
                assert!(b.a < b.b, "bond {b:?} must be ordered");
            }
        }
    }

    #[test]
    fn lattice_incident_bonds_match_neighbors() {
        let lat = Lattice::new(3).unwrap();
        for site in 0..lat.n_sites() {
            let mut from_bonds: Vec<usize> = lat
                .incident_bonds(site)
                .unwrap()
                .iter()
                .map(|b| b.other(site).unwrap())
                .collect();
            let mut nbrs = lat.neighbors(site).unwrap();
            from_bonds.sort_unstable();
            nbrs.sort_unstable();
            assert_eq!(from_bonds, nbrs, "site {site}: incident bonds vs neighbours");
        }
        // Centre of a 3×3 grid has four neighbours, corners two.
        assert_eq!(lat.neighbors(4).unwrap().len(), 4);
        assert_eq!(lat.neighbors(0).unwrap().len(), 2);
    }

    #[test]
    fn lattice_site_range_is_checked() {
        let lat = Lattice::new(2).unwrap();
        assert!(matches!(
            lat.incident_bonds(4),
            Err(Error::SiteOutOfRange { site: 4, n_sites: 4 })
        ));
        assert_eq!(lat.hilbert_dim(), 16);
    }
}
