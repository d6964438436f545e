//! CUDA backend: the same pool/init/grid-stride semantics on a real
//! device.
//!
//! The kernel source is compiled at runtime via NVRTC. Seeding matches the
//! host engine bit-for-bit (same SplitMix64 expansion, same skip-ahead
//! matrices), so host and device generators with equal parameters produce
//! identical raw streams.

mod cuda;

pub use cuda::{is_cuda_available, CudaGenerator};

/// CUDA kernel source for the MRG32k3a engine pool.
///
/// All operands stay below 2^32, so 64-bit products never overflow.
pub const MRG32K3A_KERNEL_SOURCE: &str = r#"
typedef unsigned long long ull;

#define M1 4294967087ULL
#define M2 4294944443ULL
#define A12 1403580ULL
#define A13N 810728ULL
#define A21 527612ULL
#define A23N 1370589ULL
#define SUBSEQ_LOG2 67

__device__ ull mul_mod(ull a, ull b, ull m) {
    return (a * b) % m;
}

__device__ void mat_mul(const ull* a, const ull* b, ull* c, ull m) {
    ull t[9];
    for (int i = 0; i < 3; ++i) {
        for (int j = 0; j < 3; ++j) {
            ull acc = 0;
            for (int k = 0; k < 3; ++k) {
                acc = (acc + mul_mod(a[3*i+k], b[3*k+j], m)) % m;
            }
            t[3*i+j] = acc;
        }
    }
    for (int i = 0; i < 9; ++i) c[i] = t[i];
}

__device__ void mat_vec(const ull* a, ull* v, ull m) {
    ull t[3];
    for (int i = 0; i < 3; ++i) {
        ull acc = 0;
        for (int k = 0; k < 3; ++k) {
            acc = (acc + mul_mod(a[3*i+k], v[k], m)) % m;
        }
        t[i] = acc;
    }
    for (int i = 0; i < 3; ++i) v[i] = t[i];
}

__device__ void mat_pow(const ull* base, ull exp, ull* out, ull m) {
    ull result[9] = {1,0,0, 0,1,0, 0,0,1};
    ull sq[9];
    for (int i = 0; i < 9; ++i) sq[i] = base[i];
    while (exp > 0) {
        if (exp & 1ULL) mat_mul(result, sq, result, m);
        mat_mul(sq, sq, sq, m);
        exp >>= 1;
    }
    for (int i = 0; i < 9; ++i) out[i] = result[i];
}

__device__ ull splitmix64(ull* x) {
    *x += 0x9E3779B97F4A7C15ULL;
    ull z = *x;
    z = (z ^ (z >> 30)) * 0xBF58476D1CE4E5B9ULL;
    z = (z ^ (z >> 27)) * 0x94D049BB133111EBULL;
    return z ^ (z >> 31);
}

// Seed one engine: SplitMix64 expansion, then a jump of
// identity * 2^67 + offset steps per recurrence via matrix powers.
__device__ void mrg_seed(ull seed, ull identity, ull offset, ull* s) {
    ull x = seed;
    for (int i = 0; i < 3; ++i) s[i]   = splitmix64(&x) % M1;
    for (int i = 0; i < 3; ++i) s[3+i] = splitmix64(&x) % M2;
    if (s[0] == 0 && s[1] == 0 && s[2] == 0) s[0] = 1;
    if (s[3] == 0 && s[4] == 0 && s[5] == 0) s[3] = 1;

    ull a1[9] = {0,1,0, 0,0,1, M1-A13N, A12, 0};
    ull a2[9] = {0,1,0, 0,0,1, M2-A23N, 0, A21};

    ull a1p[9], a2p[9];
    for (int i = 0; i < 9; ++i) { a1p[i] = a1[i]; a2p[i] = a2[i]; }
    for (int i = 0; i < SUBSEQ_LOG2; ++i) {
        mat_mul(a1p, a1p, a1p, M1);
        mat_mul(a2p, a2p, a2p, M2);
    }

    ull skip1[9], skip2[9], off1[9], off2[9];
    mat_pow(a1p, identity, skip1, M1);
    mat_pow(a2p, identity, skip2, M2);
    mat_pow(a1, offset, off1, M1);
    mat_pow(a2, offset, off2, M2);
    mat_mul(skip1, off1, skip1, M1);
    mat_mul(skip2, off2, skip2, M2);
    mat_vec(skip1, s, M1);
    mat_vec(skip2, s + 3, M2);
}

__device__ unsigned int mrg_next(ull* s) {
    ull p1 = (mul_mod(A12, s[1], M1) + mul_mod(M1 - A13N, s[0], M1)) % M1;
    s[0] = s[1]; s[1] = s[2]; s[2] = p1;
    ull p2 = (mul_mod(A21, s[5], M2) + mul_mod(M2 - A23N, s[3], M2)) % M2;
    s[3] = s[4]; s[4] = s[5]; s[5] = p2;
    return (unsigned int)((p1 + M1 - p2) % M1);
}

__device__ float mrg_uniform(unsigned int raw) {
    return (float)(((double)raw + 1.0) * (1.0 / 4294967088.0));
}

// One engine per worker, the linear index as stream identity. The launch
// covers exactly the pool capacity, so no bound check is needed.
extern "C" __global__ void mrg_init_engines(
    ull* states,
    ull seed,
    ull offset
) {
    const ull id = (ull)blockIdx.x * blockDim.x + threadIdx.x;
    mrg_seed(seed, id, offset, states + 6 * id);
}

// Grid-stride fill with raw engine output.
extern "C" __global__ void mrg_generate(
    ull* states,
    unsigned int* out,
    ull n
) {
    const ull id = (ull)blockIdx.x * blockDim.x + threadIdx.x;
    const ull stride = (ull)gridDim.x * blockDim.x;

    ull s[6];
    for (int i = 0; i < 6; ++i) s[i] = states[6 * id + i];

    for (ull index = id; index < n; index += stride) {
        out[index] = mrg_next(s);
    }

    for (int i = 0; i < 6; ++i) states[6 * id + i] = s[i];
}

// Grid-stride fill with uniform floats in (0, 1].
extern "C" __global__ void mrg_generate_uniform(
    ull* states,
    float* out,
    ull n
) {
    const ull id = (ull)blockIdx.x * blockDim.x + threadIdx.x;
    const ull stride = (ull)gridDim.x * blockDim.x;

    ull s[6];
    for (int i = 0; i < 6; ++i) s[i] = states[6 * id + i];

    for (ull index = id; index < n; index += stride) {
        out[index] = mrg_uniform(mrg_next(s));
    }

    for (int i = 0; i < 6; ++i) states[6 * id + i] = s[i];
}

// Paired Box-Muller fill. Worker 0 alone writes the odd tail, keeping only
// the first component of its extra pair.
extern "C" __global__ void mrg_generate_normal(
    ull* states,
    float* out,
    ull n,
    float mean,
    float stddev,
    int log_space
) {
    const ull id = (ull)blockIdx.x * blockDim.x + threadIdx.x;
    const ull stride = (ull)gridDim.x * blockDim.x;
    const ull pairs = n / 2;

    ull s[6];
    for (int i = 0; i < 6; ++i) s[i] = states[6 * id + i];

    for (ull slot = id; slot < pairs; slot += stride) {
        float u1 = mrg_uniform(mrg_next(s));
        float u2 = mrg_uniform(mrg_next(s));
        float r = sqrtf(-2.0f * logf(u1));
        float theta = 6.283185307179586f * u2;
        float a = mean + stddev * (r * cosf(theta));
        float b = mean + stddev * (r * sinf(theta));
        if (log_space) { a = expf(a); b = expf(b); }
        out[2 * slot] = a;
        out[2 * slot + 1] = b;
    }

    if (id == 0 && (n & 1ULL)) {
        float u1 = mrg_uniform(mrg_next(s));
        float u2 = mrg_uniform(mrg_next(s));
        float r = sqrtf(-2.0f * logf(u1));
        float theta = 6.283185307179586f * u2;
        float a = mean + stddev * (r * cosf(theta));
        if (log_space) a = expf(a);
        out[n - 1] = a;
    }

    for (int i = 0; i < 6; ++i) states[6 * id + i] = s[i];
}
"#;
