use guardgl::*;
use proptest::collection::vec;
use proptest::prelude::*;

const MAX_CONTEXTS: usize = 5;

fn contexts(count: usize) -> Vec<SharedContext> {
  (0..count)
    .map(|i| {
      let config = ContextConfig { name: format!("ctx{}", i), ..Default::default() };
      Context::new(Box::new(FakeDriver::new(Profile::Gles2)), config).unwrap()
    })
    .collect()
}

proptest! {
  #[test]
  fn usability_follows_direct_sharing_only(
    count in 2..=MAX_CONTEXTS,
    pairs in vec((0..MAX_CONTEXTS, 0..MAX_CONTEXTS), 0..8),
    owner in 0..MAX_CONTEXTS,
  ) {
    let contexts = contexts(count);
    let owner = owner % count;
    let mut shared = vec![vec![false; count]; count];
    for &(a, b) in &pairs {
      let (a, b) = (a % count, b % count);
      contexts[a].share_with(&contexts[b]);
      shared[a][b] = true;
      shared[b][a] = true;
    }

    let owner_ctx = &contexts[owner];
    let buffer = owner_ctx.array_buffer_allocate(16, UsageHint::StaticDraw).unwrap();
    let ao = owner_ctx.array_object_allocate(&owner_ctx.array_object_new_builder()).unwrap();
    let unit = owner_ctx.texture_units()[0];

    for (current, ctx) in contexts.iter().enumerate() {
      let same = current == owner;
      prop_assert_eq!(check_usable(ctx, &*buffer).is_ok(), same || shared[current][owner]);
      prop_assert_eq!(check_usable(ctx, &*ao).is_ok(), same);
      prop_assert_eq!(check_usable(ctx, &unit).is_ok(), same);
    }
  }

  #[test]
  fn deleted_objects_are_rejected_everywhere(count in 1..=MAX_CONTEXTS) {
    let contexts = contexts(count);
    for ctx in &contexts[1..] {
      contexts[0].share_with(ctx);
    }
    let buffer = contexts[0].array_buffer_allocate(4, UsageHint::StaticDraw).unwrap();
    contexts[0].array_buffer_delete(&buffer).unwrap();

    for ctx in &contexts {
      prop_assert!(matches!(ctx.check_object(&*buffer), Err(GlError::Deleted(_))));
    }
  }
}
