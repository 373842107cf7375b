use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{event, span, Level};
use tracing_subscriber::prelude::*;

mod geometry {
    use std::cmp::{max, min};
    use std::collections::BTreeMap;
    use std::fmt::{self, Display, Formatter};

    /// A half-open range `[start, stop)` of integer coordinates along
    /// one axis.
    #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
    pub struct Interval {
        pub start: i64,
        pub stop: i64,
    }

    impl Interval {
        pub const EMPTY: Interval = Interval::new(0, 0);

        pub const fn new(start: i64, stop: i64) -> Interval {
            Interval { start, stop }
        }

        pub fn is_empty(&self) -> bool {
            self.start >= self.stop
        }

        pub fn len(&self) -> u64 {
            if self.is_empty() {
                0
            } else {
                self.stop.abs_diff(self.start)
            }
        }

        pub fn contains(&self, v: i64) -> bool {
            self.start <= v && v < self.stop
        }

        fn overlap(&self, other: &Interval) -> Option<Interval> {
            let result = Interval::new(max(self.start, other.start), min(self.stop, other.stop));
            if result.is_empty() {
                None
            } else {
                Some(result)
            }
        }
    }

    // Exterior pieces reach out to these bounds on their unconstrained
    // axes.  Parsed input never gets near them (see `COORDINATE_LIMIT`).
    const NEAR: i64 = i64::MIN;
    const FAR: i64 = i64::MAX;

    /// An axis-aligned box made of one interval per axis.
    #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
    pub struct Cuboid {
        pub x: Interval,
        pub y: Interval,
        pub z: Interval,
    }

    impl Display for Cuboid {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            // Shown the way the input writes it, with inclusive bounds.
            write!(
                f,
                "x={}..{},y={}..{},z={}..{}",
                self.x.start,
                self.x.stop - 1,
                self.y.start,
                self.y.stop - 1,
                self.z.start,
                self.z.stop - 1
            )
        }
    }

    impl Cuboid {
        pub const EMPTY: Cuboid = Cuboid::new(Interval::EMPTY, Interval::EMPTY, Interval::EMPTY);

        pub const fn new(x: Interval, y: Interval, z: Interval) -> Cuboid {
            Cuboid { x, y, z }
        }

        fn axes(&self) -> [Interval; 3] {
            [self.x, self.y, self.z]
        }

        fn from_axes(axes: [Interval; 3]) -> Cuboid {
            let [x, y, z] = axes;
            Cuboid { x, y, z }
        }

        /// Number of unit cubes inside the box.  Only meaningful for
        /// bounded boxes; the pieces returned by `exterior()` are never
        /// measured directly.
        pub fn volume(&self) -> u128 {
            u128::from(self.x.len()) * u128::from(self.y.len()) * u128::from(self.z.len())
        }

        pub fn contains(&self, x: i64, y: i64, z: i64) -> bool {
            self.x.contains(x) && self.y.contains(y) && self.z.contains(z)
        }

        /// The intersection of two boxes.  When they don't overlap on
        /// some axis the result is `Cuboid::EMPTY` rather than a box
        /// which is empty on only that axis.
        pub fn intersect(&self, other: &Cuboid) -> Cuboid {
            match (
                self.x.overlap(&other.x),
                self.y.overlap(&other.y),
                self.z.overlap(&other.z),
            ) {
                (Some(x), Some(y), Some(z)) => Cuboid { x, y, z },
                _ => Cuboid::EMPTY,
            }
        }

        /// Six pairwise-disjoint boxes which together cover everything
        /// outside `self`.
        ///
        /// The first two are the slabs below and above `self` in x.
        /// The next two are confined to `self`'s x range and lie below
        /// and above it in y.  The last two are confined to `self`'s x
        /// and y ranges and lie below and above it in z.
        pub fn exterior(&self) -> [Cuboid; 6] {
            let all = Interval::new(NEAR, FAR);
            let below = |r: Interval| Interval::new(NEAR, r.start);
            let above = |r: Interval| Interval::new(r.stop, FAR);
            [
                Cuboid::new(below(self.x), all, all),
                Cuboid::new(above(self.x), all, all),
                Cuboid::new(self.x, below(self.y), all),
                Cuboid::new(self.x, above(self.y), all),
                Cuboid::new(self.x, self.y, below(self.z)),
                Cuboid::new(self.x, self.y, above(self.z)),
            ]
        }

        /// The part of `self` which is not covered by `other`.
        pub fn subtract(&self, other: &Cuboid) -> Region {
            if self.intersect(other).volume() == 0 {
                return Region::from(*self);
            }
            Region {
                cuboids: other
                    .exterior()
                    .iter()
                    .map(|e| self.intersect(e))
                    .filter(|piece| piece.volume() > 0)
                    .collect(),
            }
        }
    }

    /// A set of points, held as a collection of boxes no two of which
    /// overlap.
    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    pub struct Region {
        cuboids: Vec<Cuboid>,
    }

    impl From<Cuboid> for Region {
        fn from(cuboid: Cuboid) -> Region {
            Region {
                cuboids: if cuboid.volume() > 0 {
                    vec![cuboid]
                } else {
                    Vec::new()
                },
            }
        }
    }

    impl Region {
        pub fn new() -> Region {
            Region::default()
        }

        pub fn cuboids(&self) -> &[Cuboid] {
            &self.cuboids
        }

        /// Number of fragments (member boxes).
        pub fn len(&self) -> usize {
            self.cuboids.len()
        }

        pub fn is_empty(&self) -> bool {
            self.cuboids.is_empty()
        }

        pub fn volume(&self) -> u128 {
            self.cuboids.iter().map(Cuboid::volume).sum()
        }

        pub fn subtract(self, other: &Cuboid) -> Region {
            Region {
                cuboids: self
                    .cuboids
                    .iter()
                    .flat_map(|c| c.subtract(other).cuboids)
                    .collect(),
            }
        }

        pub fn subtract_region(self, other: &Region) -> Region {
            other.cuboids.iter().fold(self, |acc, c| acc.subtract(c))
        }

        /// Union with a box or another region.  The existing fragments
        /// are kept as they are; only the parts of `other` not already
        /// in `self` are appended.
        pub fn add<R: Into<Region>>(self, other: R) -> Region {
            let fresh = other.into().subtract_region(&self);
            let mut cuboids = self.cuboids;
            cuboids.extend(fresh.cuboids);
            Region { cuboids }
        }

        pub fn intersect(&self, window: &Cuboid) -> Region {
            Region {
                cuboids: self
                    .cuboids
                    .iter()
                    .map(|c| c.intersect(window))
                    .filter(|c| c.volume() > 0)
                    .collect(),
            }
        }

        /// Merge fragments which share their extent on two axes and
        /// abut on the third.  The set of points covered is unchanged.
        pub fn coalesce(self) -> Region {
            let mut cuboids = self.cuboids;
            loop {
                let before = cuboids.len();
                for axis in 0..3 {
                    cuboids = merge_along(cuboids, axis);
                }
                if cuboids.len() == before {
                    return Region { cuboids };
                }
            }
        }
    }

    fn merge_along(cuboids: Vec<Cuboid>, axis: usize) -> Vec<Cuboid> {
        let rebuild = |along: Interval, key: &[Interval; 2]| {
            let mut axes = [Interval::EMPTY; 3];
            axes[axis] = along;
            axes[(axis + 1) % 3] = key[0];
            axes[(axis + 2) % 3] = key[1];
            Cuboid::from_axes(axes)
        };

        let mut columns: BTreeMap<[Interval; 2], Vec<Interval>> = BTreeMap::new();
        for c in &cuboids {
            let axes = c.axes();
            columns
                .entry([axes[(axis + 1) % 3], axes[(axis + 2) % 3]])
                .or_default()
                .push(axes[axis]);
        }

        let mut result = Vec::with_capacity(cuboids.len());
        for (key, mut spans) in columns {
            // Members of a region are disjoint, so spans sharing a key
            // never overlap and sorting puts neighbours side by side.
            spans.sort();
            let mut run: Option<Interval> = None;
            for span in spans {
                run = match run {
                    Some(current) if current.stop == span.start => {
                        Some(Interval::new(current.start, span.stop))
                    }
                    Some(current) => {
                        result.push(rebuild(current, &key));
                        Some(span)
                    }
                    None => Some(span),
                };
            }
            if let Some(current) = run {
                result.push(rebuild(current, &key));
            }
        }
        result
    }

    #[cfg(test)]
    pub fn assert_disjoint(region: &Region) {
        let cuboids = region.cuboids();
        for (i, a) in cuboids.iter().enumerate() {
            for b in &cuboids[i + 1..] {
                assert_eq!(a.intersect(b).volume(), 0, "{} overlaps {}", a, b);
            }
        }
    }

    #[cfg(test)]
    fn cube(x: (i64, i64), y: (i64, i64), z: (i64, i64)) -> Cuboid {
        Cuboid::new(
            Interval::new(x.0, x.1 + 1),
            Interval::new(y.0, y.1 + 1),
            Interval::new(z.0, z.1 + 1),
        )
    }

    #[test]
    fn test_interval_len() {
        assert_eq!(Interval::new(-3, 4).len(), 7);
        assert_eq!(Interval::new(5, 5).len(), 0);
        assert!(Interval::new(5, 5).is_empty());
        assert_eq!(Interval::new(i64::MIN, i64::MAX).len(), u64::MAX);
    }

    #[test]
    fn test_intersect() {
        let a = cube((10, 12), (10, 12), (10, 12));
        let b = cube((11, 13), (11, 13), (11, 13));
        assert_eq!(a.intersect(&b), cube((11, 12), (11, 12), (11, 12)));
        assert_eq!(a.intersect(&b).volume(), 8);

        // Overlapping in x and y but not in z.
        let c = cube((10, 12), (10, 12), (20, 22));
        assert_eq!(a.intersect(&c), Cuboid::EMPTY);
        assert_eq!(Cuboid::EMPTY.volume(), 0);
    }

    #[test]
    fn test_exterior_partitions_space() {
        let b = cube((0, 1), (0, 1), (0, 1));
        let exterior = b.exterior();
        for (i, e) in exterior.iter().enumerate() {
            assert_eq!(e.intersect(&b), Cuboid::EMPTY);
            for f in &exterior[i + 1..] {
                assert_eq!(e.intersect(f), Cuboid::EMPTY);
            }
        }
        // Every point near the box is in exactly one of b and its
        // exterior pieces.
        for x in -2..4 {
            for y in -2..4 {
                for z in -2..4 {
                    let owners = exterior.iter().filter(|e| e.contains(x, y, z)).count()
                        + usize::from(b.contains(x, y, z));
                    assert_eq!(owners, 1, "point ({},{},{})", x, y, z);
                }
            }
        }
    }

    #[test]
    fn test_subtract_self_is_empty() {
        let a = cube((-5, 7), (3, 9), (0, 0));
        let diff = a.subtract(&a);
        assert_eq!(diff.volume(), 0);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_subtract_disjoint_is_identity() {
        let a = cube((0, 9), (0, 9), (0, 9));
        let b = cube((10, 19), (0, 9), (0, 9));
        let diff = a.subtract(&b);
        assert_eq!(diff.volume(), a.volume());
        assert_eq!(diff.cuboids(), &[a]);
    }

    #[test]
    fn test_subtract_corner() {
        let a = cube((10, 12), (10, 12), (10, 12));
        let b = cube((11, 13), (11, 13), (11, 13));
        let diff = a.subtract(&b);
        assert_eq!(diff.volume(), 27 - 8);
        assert_disjoint(&diff);
        for c in diff.cuboids() {
            assert_eq!(c.intersect(&a), *c);
        }
    }

    #[test]
    fn test_subtract_hole() {
        // Punching out the middle leaves all six exterior pieces.
        let a = cube((0, 2), (0, 2), (0, 2));
        let b = cube((1, 1), (1, 1), (1, 1));
        let diff = a.subtract(&b);
        assert_eq!(diff.len(), 6);
        assert_eq!(diff.volume(), 26);
        assert_disjoint(&diff);
    }

    #[test]
    fn test_subtract_from_empty_cuboid() {
        let flat = Cuboid::new(Interval::new(0, 5), Interval::new(3, 3), Interval::new(0, 5));
        assert!(flat.subtract(&cube((0, 9), (0, 9), (0, 9))).is_empty());
        assert!(flat.subtract(&cube((20, 29), (0, 9), (0, 9))).is_empty());
    }

    #[test]
    fn test_region_add() {
        let a = cube((10, 12), (10, 12), (10, 12));
        let b = cube((11, 13), (11, 13), (11, 13));
        let region = Region::new().add(a);
        assert_eq!(region.volume(), 27);
        let region = region.add(b);
        assert_eq!(region.volume(), 27 + 27 - 8);
        assert_disjoint(&region);
        // The existing fragment comes first, untouched.
        assert_eq!(region.cuboids()[0], a);
    }

    #[test]
    fn test_region_add_is_monotonic_and_idempotent() {
        let boxes = [
            cube((0, 4), (0, 4), (0, 4)),
            cube((2, 6), (-3, 1), (1, 2)),
            cube((1, 1), (1, 1), (1, 1)),
            cube((-8, 8), (3, 3), (-8, 8)),
        ];
        let mut region = Region::new();
        for b in boxes {
            let before = region.volume();
            region = region.add(b);
            assert!(region.volume() >= before);
            let once = region.volume();
            region = region.add(b);
            assert_eq!(region.volume(), once);
            assert_disjoint(&region);
        }
    }

    #[test]
    fn test_region_add_region() {
        let left = Region::new()
            .add(cube((0, 3), (0, 3), (0, 3)))
            .add(cube((10, 13), (0, 3), (0, 3)));
        let right = Region::new().add(cube((2, 11), (0, 3), (0, 3)));
        let union = left.add(right);
        assert_eq!(union.volume(), 14 * 4 * 4);
        assert_disjoint(&union);
    }

    #[test]
    fn test_region_subtract_region() {
        let whole = Region::new().add(cube((0, 9), (0, 9), (0, 9)));
        let holes = Region::new()
            .add(cube((0, 0), (0, 0), (0, 0)))
            .add(cube((5, 9), (5, 9), (5, 9)));
        let rest = whole.subtract_region(&holes);
        assert_eq!(rest.volume(), 1000 - 1 - 125);
        assert_disjoint(&rest);
    }

    #[test]
    fn test_region_volume_is_sum_of_fragments() {
        let region = Region::new()
            .add(cube((0, 9), (0, 9), (0, 9)))
            .subtract(&cube((3, 5), (3, 5), (-10, 20)))
            .add(cube((8, 12), (8, 12), (8, 12)));
        let sum: u128 = region.cuboids().iter().map(|c| c.volume()).sum();
        assert_eq!(region.volume(), sum);
        assert_eq!(region.volume(), 1000 - 90 + 125 - 8);
    }

    #[test]
    fn test_region_intersect() {
        let window = cube((-50, 50), (-50, 50), (-50, 50));
        let far = Region::new().add(cube((-54112, -39298), (-85059, -49293), (-27449, 7877)));
        assert_eq!(far.intersect(&window).volume(), 0);
        assert!(far.intersect(&window).is_empty());

        let straddling = Region::new().add(cube((-54112, 39298), (-85059, -19), (20, 200)));
        assert_eq!(
            straddling.intersect(&window).cuboids(),
            &[cube((-50, 50), (-50, -19), (20, 50))]
        );
    }

    #[test]
    fn test_coalesce() {
        // A hole punched and then refilled leaves seven fragments which
        // fit back together into the original box.
        let a = cube((0, 2), (0, 2), (0, 2));
        let middle = cube((1, 1), (1, 1), (1, 1));
        let region = Region::new().add(a).subtract(&middle).add(middle);
        assert_eq!(region.len(), 7);
        let merged = region.coalesce();
        assert_eq!(merged.volume(), 27);
        assert_eq!(merged.cuboids(), &[a]);
    }

    #[test]
    fn test_coalesce_keeps_separate_pieces() {
        let region = Region::new()
            .add(cube((0, 1), (0, 1), (0, 1)))
            .add(cube((3, 4), (0, 1), (0, 1)))
            .add(cube((2, 2), (0, 0), (0, 1)));
        let before = region.len();
        let volume = region.volume();
        let merged = region.coalesce();
        assert!(merged.len() <= before);
        assert_eq!(merged.volume(), volume);
        assert_disjoint(&merged);
    }
}

mod reactor {
    use std::fmt::{self, Display, Formatter};

    use super::geometry::{Cuboid, Interval, Region};

    /// The cubes counted for part 1: -50..=50 on every axis.
    pub const INITIALISATION_AREA: Cuboid = Cuboid::new(
        Interval::new(-50, 51),
        Interval::new(-50, 51),
        Interval::new(-50, 51),
    );

    #[derive(Debug, PartialEq, Eq)]
    pub enum Command {
        On(Cuboid),
        Off(Cuboid),
    }

    impl Command {
        pub fn new_state(&self) -> bool {
            matches!(self, Command::On(_))
        }

        pub fn affects(&self) -> &Cuboid {
            match self {
                Command::On(c) | Command::Off(c) => c,
            }
        }
    }

    impl Display for Command {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            let state = if self.new_state() { "on" } else { "off" };
            write!(f, "{} {}", state, self.affects())
        }
    }

    pub trait CubeFlipper {
        fn count_cubes_on(&self) -> u128;
        fn obey(&mut self, command: &Command);
    }

    /// Tracks the lit cubes as a `Region`.
    #[derive(Debug)]
    pub struct Reactor {
        lit: Region,
        coalesce: bool,
    }

    impl Reactor {
        pub fn new(coalesce: bool) -> Reactor {
            Reactor {
                lit: Region::new(),
                coalesce,
            }
        }

        pub fn fragments(&self) -> usize {
            self.lit.len()
        }

        pub fn lit_volume_within(&self, window: &Cuboid) -> u128 {
            self.lit.intersect(window).volume()
        }

        #[cfg(test)]
        pub fn region(&self) -> &Region {
            &self.lit
        }
    }

    impl CubeFlipper for Reactor {
        fn count_cubes_on(&self) -> u128 {
            self.lit.volume()
        }

        fn obey(&mut self, command: &Command) {
            let lit = std::mem::take(&mut self.lit);
            let lit = match command {
                Command::On(c) => lit.add(*c),
                Command::Off(c) => lit.subtract(c),
            };
            self.lit = if self.coalesce { lit.coalesce() } else { lit };
        }
    }

    /// Tracks every lit cube individually.  Only usable for small
    /// inputs; it checks the results of `Reactor`.
    #[cfg(test)]
    pub struct PointReactor {
        on: std::collections::HashSet<(i64, i64, i64)>,
    }

    #[cfg(test)]
    impl PointReactor {
        pub fn new() -> PointReactor {
            PointReactor {
                on: std::collections::HashSet::new(),
            }
        }

        pub fn count_within(&self, window: &Cuboid) -> u128 {
            self.on
                .iter()
                .filter(|(x, y, z)| window.contains(*x, *y, *z))
                .count() as u128
        }
    }

    #[cfg(test)]
    impl CubeFlipper for PointReactor {
        fn count_cubes_on(&self) -> u128 {
            self.on.len() as u128
        }

        fn obey(&mut self, command: &Command) {
            match command {
                Command::On(c) => {
                    for x in c.x.start..c.x.stop {
                        for y in c.y.start..c.y.stop {
                            for z in c.z.start..c.z.stop {
                                self.on.insert((x, y, z));
                            }
                        }
                    }
                }
                Command::Off(c) => self.on.retain(|(x, y, z)| !c.contains(*x, *y, *z)),
            }
        }
    }

    #[cfg(test)]
    fn on(x: (i64, i64), y: (i64, i64), z: (i64, i64)) -> Command {
        Command::On(Cuboid::new(
            Interval::new(x.0, x.1 + 1),
            Interval::new(y.0, y.1 + 1),
            Interval::new(z.0, z.1 + 1),
        ))
    }

    #[cfg(test)]
    fn off(x: (i64, i64), y: (i64, i64), z: (i64, i64)) -> Command {
        match on(x, y, z) {
            Command::On(c) => Command::Off(c),
            other => other,
        }
    }

    #[cfg(test)]
    fn run<T: CubeFlipper>(commands: &[Command], reactor: &mut T) -> u128 {
        for command in commands {
            reactor.obey(command);
        }
        reactor.count_cubes_on()
    }

    #[test]
    fn test_command_display() {
        assert_eq!(
            off((-20, 26), (-36, 17), (-47, 7)).to_string(),
            "off x=-20..26,y=-36..17,z=-47..7"
        );
    }

    #[test]
    fn test_on_then_off_corner() {
        let commands = [on((10, 12), (10, 12), (10, 12)), off((11, 13), (11, 13), (11, 13))];
        assert_eq!(run(&commands, &mut Reactor::new(false)), 19);
    }

    #[test]
    fn test_two_overlapping_boxes() {
        let commands = [
            on((-20, 26), (-36, 17), (-47, 7)),
            on((-20, 33), (-21, 23), (-26, 28)),
        ];
        let first: u128 = 47 * 54 * 55;
        let second: u128 = 54 * 45 * 55;
        let common: u128 = 47 * 39 * 34;
        assert_eq!(run(&commands, &mut Reactor::new(false)), first + second - common);
    }

    #[test]
    fn test_on_then_off_is_empty() {
        let a = ((3, 8), (-4, 0), (10, 11));
        let mut reactor = Reactor::new(false);
        assert_eq!(run(&[on(a.0, a.1, a.2), off(a.0, a.1, a.2)], &mut reactor), 0);
        assert!(reactor.region().is_empty());
    }

    #[test]
    fn test_order_matters() {
        let a = ((0, 4), (0, 4), (0, 4));
        let b = ((-1, 5), (-1, 5), (-1, 5));
        let on_then_off = [on(a.0, a.1, a.2), off(b.0, b.1, b.2)];
        let off_then_on = [off(b.0, b.1, b.2), on(a.0, a.1, a.2)];
        assert_eq!(run(&on_then_off, &mut Reactor::new(false)), 0);
        assert_eq!(run(&off_then_on, &mut Reactor::new(false)), 125);
    }

    #[test]
    fn test_outside_initialisation_area() {
        let mut reactor = Reactor::new(false);
        reactor.obey(&on((-54112, -39298), (-85059, -49293), (-27449, 7877)));
        assert_eq!(reactor.lit_volume_within(&INITIALISATION_AREA), 0);
        assert!(reactor.count_cubes_on() > 0);
    }

    #[test]
    fn test_agrees_with_point_reactor() {
        let commands = [
            on((-3, 3), (-3, 3), (-3, 3)),
            off((-1, 1), (-5, 5), (-1, 1)),
            on((0, 5), (0, 0), (-4, 4)),
            off((2, 6), (2, 6), (2, 6)),
            on((-6, -2), (1, 4), (-2, 2)),
            off((-3, -3), (-3, 3), (-3, 3)),
            on((-1, 1), (-1, 1), (-1, 1)),
            off((4, 4), (-6, 6), (0, 0)),
        ];
        let window = Cuboid::new(Interval::new(-2, 3), Interval::new(-2, 3), Interval::new(-2, 3));
        let mut points = PointReactor::new();
        let mut plain = Reactor::new(false);
        let mut merging = Reactor::new(true);
        for command in &commands {
            points.obey(command);
            plain.obey(command);
            merging.obey(command);
            assert_eq!(plain.count_cubes_on(), points.count_cubes_on(), "after {}", command);
            assert_eq!(merging.count_cubes_on(), points.count_cubes_on(), "after {}", command);
            super::geometry::assert_disjoint(plain.region());
            super::geometry::assert_disjoint(merging.region());
        }
        assert_eq!(plain.lit_volume_within(&window), points.count_within(&window));
    }
}

mod parse {
    use std::error::Error;
    use std::fmt::{self, Display, Formatter};
    use std::str::FromStr;

    use nom::{
        branch::alt,
        bytes::complete::tag,
        character::complete::{char, digit1},
        combinator::{all_consuming, map, map_res, opt, recognize, value},
        sequence::{delimited, preceded, separated_pair, tuple},
        IResult,
    };

    use super::geometry::{Cuboid, Interval};
    use super::reactor::Command;

    #[derive(Debug, PartialEq, Eq)]
    pub struct BadInput {
        pub line: usize,
        pub text: String,
        pub problem: String,
    }

    impl Display for BadInput {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "line {}: {}: '{}'", self.line, self.problem, self.text)
        }
    }

    impl Error for BadInput {}

    type Bounds = (i64, i64);

    /// Largest coordinate magnitude accepted.  Every box, and every
    /// region of disjoint boxes, inside `[-2^40, 2^40]` on each axis
    /// has a volume which fits in a `u128`.
    pub const COORDINATE_LIMIT: i64 = 1 << 40;

    fn i64_parser(input: &str) -> IResult<&str, i64> {
        map_res(
            recognize(tuple((opt(char('-')), digit1))),
            FromStr::from_str,
        )(input)
    }

    fn parse_bounds(input: &str) -> IResult<&str, Bounds> {
        separated_pair(i64_parser, tag(".."), i64_parser)(input)
    }

    fn parse_axes(input: &str) -> IResult<&str, [Bounds; 3]> {
        map(
            tuple((
                delimited(tag("x="), parse_bounds, tag(",")),
                delimited(tag("y="), parse_bounds, tag(",")),
                preceded(tag("z="), parse_bounds),
            )),
            |(x, y, z)| [x, y, z],
        )(input)
    }

    fn parse_state(input: &str) -> IResult<&str, bool> {
        alt((value(true, tag("on")), value(false, tag("off"))))(input)
    }

    fn parse_raw_command(input: &str) -> IResult<&str, (bool, [Bounds; 3])> {
        all_consuming(separated_pair(parse_state, char(' '), parse_axes))(input)
    }

    /// Converts inclusive bounds `lo..hi` to the half-open `[lo, hi+1)`.
    fn convert_to_interval(bounds: Bounds) -> Result<Interval, String> {
        let (lo, hi) = bounds;
        if lo > hi {
            return Err(format!("inverted range {}..{}", lo, hi));
        }
        let allowed = -COORDINATE_LIMIT..=COORDINATE_LIMIT;
        if let Some(v) = [lo, hi].into_iter().find(|v| !allowed.contains(v)) {
            return Err(format!(
                "coordinate {} is outside -{}..{}",
                v, COORDINATE_LIMIT, COORDINATE_LIMIT
            ));
        }
        Ok(Interval::new(lo, hi + 1))
    }

    fn parse_command(s: &str) -> Result<Command, String> {
        let (on, [x, y, z]) = match parse_raw_command(s) {
            Ok((_, parts)) => parts,
            Err(e) => {
                return Err(format!("syntax error: {}", e));
            }
        };
        let cuboid = Cuboid::new(
            convert_to_interval(x)?,
            convert_to_interval(y)?,
            convert_to_interval(z)?,
        );
        Ok(if on {
            Command::On(cuboid)
        } else {
            Command::Off(cuboid)
        })
    }

    /// Parses the whole puzzle input.  Blank lines are skipped; any
    /// other line which isn't a valid command fails the whole parse.
    pub fn parse_commands(input: &str) -> Result<Vec<Command>, BadInput> {
        let mut commands = Vec::new();
        for (i, line) in input.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_command(line) {
                Ok(command) => commands.push(command),
                Err(problem) => {
                    return Err(BadInput {
                        line: i + 1,
                        text: line.to_string(),
                        problem,
                    });
                }
            }
        }
        Ok(commands)
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("on x=10..12,y=10..12,z=10..12"),
            Ok(Command::On(Cuboid::new(
                Interval::new(10, 13),
                Interval::new(10, 13),
                Interval::new(10, 13)
            )))
        );
        assert_eq!(
            parse_command("off x=-54112..-39298,y=-85059..-49293,z=-27449..7877"),
            Ok(Command::Off(Cuboid::new(
                Interval::new(-54112, -39297),
                Interval::new(-85059, -49292),
                Interval::new(-27449, 7878)
            )))
        );
    }

    #[test]
    fn test_parse_command_rejects_bad_lines() {
        assert!(parse_command("toggle x=1..2,y=1..2,z=1..2").is_err());
        assert!(parse_command("on x=1..2,y=1..2").is_err());
        assert!(parse_command("on x=1..2,y=1..2,z=1..2 and more").is_err());
        assert!(parse_command("on x=1..2,y=a..2,z=1..2").is_err());
        assert_eq!(
            parse_command("on x=1..2,y=5..4,z=1..2"),
            Err("inverted range 5..4".to_string())
        );
        assert!(parse_command(&format!("on x=1..2,y=1..2,z=1..{}", i64::MAX)).is_err());
        assert!(parse_command(&format!("on x={}..0,y=1..2,z=1..2", i64::MIN)).is_err());
        assert_eq!(
            parse_command("off x=1..2,y=1..2,z=0..1099511627777"),
            Err("coordinate 1099511627777 is outside -1099511627776..1099511627776".to_string())
        );
        assert!(parse_command("on x=-1099511627776..1099511627776,y=0..0,z=0..0").is_ok());
    }

    #[test]
    fn test_parse_commands() {
        let input = "on x=1..2,y=1..2,z=1..2\n\n  off x=2..2,y=2..2,z=2..2  \n";
        assert_eq!(parse_commands(input).map(|v| v.len()), Ok(2));
        assert_eq!(parse_commands(""), Ok(Vec::new()));
    }

    #[test]
    fn test_parse_commands_reports_line() {
        let input = "on x=1..2,y=1..2,z=1..2\n\noff x=1..2,y=1..2\n";
        match parse_commands(input) {
            Err(e) => {
                assert_eq!(e.line, 3);
                assert_eq!(e.text, "off x=1..2,y=1..2");
                assert!(e.to_string().starts_with("line 3: syntax error"));
            }
            Ok(commands) => panic!("unexpectedly parsed {:?}", commands),
        }
    }
}

use parse::parse_commands;
use reactor::{Command, CubeFlipper, Reactor, INITIALISATION_AREA};

/// Reboot the reactor described by the puzzle input.
#[derive(Debug, Parser, PartialEq, Eq)]
#[command(name = "day22")]
struct Args {
    /// Merge neighbouring fragments after every command
    #[arg(long)]
    coalesce: bool,

    /// Input file path; standard input if omitted
    input: Option<PathBuf>,
}

#[test]
fn test_args() {
    assert_eq!(
        Args::try_parse_from(["day22"]).expect("valid arguments"),
        Args {
            coalesce: false,
            input: None
        }
    );
    assert_eq!(
        Args::try_parse_from(["day22", "--coalesce", "input.txt"]).expect("valid arguments"),
        Args {
            coalesce: true,
            input: Some(PathBuf::from("input.txt"))
        }
    );
    assert!(Args::try_parse_from(["day22", "--verbose"]).is_err());
    assert!(Args::try_parse_from(["day22", "a.txt", "b.txt"]).is_err());
}

fn read_input(path: Option<&Path>) -> Result<String, String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e)),
        None => {
            let mut input = String::new();
            match io::stdin().read_to_string(&mut input) {
                Ok(_) => Ok(input),
                Err(e) => Err(format!("failed to read input: {}", e)),
            }
        }
    }
}

fn reboot(commands: &[Command], reactor: &mut Reactor) {
    let span = span!(Level::INFO, "reboot", commands = commands.len());
    let _enter = span.enter();
    for (i, command) in commands.iter().enumerate() {
        reactor.obey(command);
        event!(
            Level::DEBUG,
            "{} / {}: {}: {} fragments",
            i + 1,
            commands.len(),
            command,
            reactor.fragments(),
        );
    }
    event!(Level::INFO, "reboot complete, {} fragments", reactor.fragments());
}

const SAMPLE: &str = "on x=10..12,y=10..12,z=10..12
on x=11..13,y=11..13,z=11..13
off x=9..11,y=9..11,z=9..11
on x=10..10,y=10..10,z=10..10
";

#[test]
fn test_sample() {
    let commands = parse_commands(SAMPLE).expect("valid test input");
    let mut reactor = Reactor::new(false);
    reboot(&commands, &mut reactor);
    assert_eq!(reactor.count_cubes_on(), 39);
    assert_eq!(reactor.lit_volume_within(&INITIALISATION_AREA), 39);

    let mut merging = Reactor::new(true);
    reboot(&commands, &mut merging);
    assert_eq!(merging.count_cubes_on(), 39);
}

#[test]
fn test_volume_beyond_u64() {
    let commands = parse_commands(
        "on x=-3000000..3000000,y=-3000000..3000000,z=-3000000..3000000\n\
         off x=0..0,y=0..0,z=0..0\n",
    )
    .expect("valid test input");
    let mut reactor = Reactor::new(false);
    reboot(&commands, &mut reactor);
    assert_eq!(reactor.count_cubes_on(), 216_000_108_000_018_000_000);
    assert_eq!(reactor.lit_volume_within(&INITIALISATION_AREA), 101 * 101 * 101 - 1);

    let edge = parse::COORDINATE_LIMIT;
    let commands = parse_commands(&format!(
        "on x={}..{},y={}..{},z={}..{}",
        -edge, edge, -edge, edge, -edge, edge
    ))
    .expect("valid test input");
    let mut reactor = Reactor::new(false);
    reboot(&commands, &mut reactor);
    let side = 2 * edge as u128 + 1;
    assert_eq!(reactor.count_cubes_on(), side * side * side);
}

fn part1(reactor: &Reactor) {
    println!(
        "Day 22 part 1: {} cubes are on",
        reactor.lit_volume_within(&INITIALISATION_AREA)
    );
}

fn part2(reactor: &Reactor) {
    println!("Day 22 part 2: {} cubes are on", reactor.count_cubes_on());
}

fn run() -> Result<(), String> {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            return Err(e.to_string());
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let args = Args::parse();
    let input = read_input(args.input.as_deref())?;
    let commands = parse_commands(&input).map_err(|e| e.to_string())?;
    event!(Level::INFO, "parsed {} commands", commands.len());

    let mut reactor = Reactor::new(args.coalesce);
    reboot(&commands, &mut reactor);
    part1(&reactor);
    part2(&reactor);
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
