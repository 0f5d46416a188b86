use rand::Rng;
use rand_distr::{Distribution, Normal, NormalError, Uniform};

enum Dist {
    Normal(Normal<f32>),
    Uniform(Uniform<f32>),
    Constant(f32),
}

impl Dist {
    fn new(mean: f32, stdev: f32, use_gaussian: bool) -> Result<Self, NormalError> {
        if use_gaussian {
            Normal::new(mean, stdev).map(Self::Normal)
        } else if stdev > 0.0 {
            Ok(Self::Uniform(Uniform::new(mean - stdev, mean + stdev)))
        } else {
            Ok(Self::Constant(mean))
        }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        match self {
            Dist::Normal(x) => x.sample(rng),
            Dist::Uniform(x) => x.sample(rng),
            Dist::Constant(x) => *x,
        }
    }
}

pub fn vec_f32<R: Rng + ?Sized>(
    rng: &mut R,
    length: usize,
    mean: f32,
    stdev: f32,
    use_gaussian: bool,
) -> Result<Vec<f32>, NormalError> {
    let dist = Dist::new(mean, stdev, use_gaussian)?;
    Ok((0..length).map(|_| dist.sample(rng)).collect())
}

/// Uniform integers in `[low, high)`, or `low` repeated if the range is empty.
pub fn vec_i32<R: Rng + ?Sized>(rng: &mut R, length: usize, low: i32, high: i32) -> Vec<i32> {
    if low >= high {
        return vec![low; length];
    }

    let dist = Uniform::new(low, high);
    (0..length).map(|_| dist.sample(rng)).collect()
}
