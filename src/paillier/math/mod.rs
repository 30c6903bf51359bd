// Réexporte toutes les fonctions mathématiques

mod math;

pub use math::{
    l_function, gcd, lcm, neg_mod, mod_inverse,
    is_probable_prime, next_probable_prime, random_prime_over,
};
